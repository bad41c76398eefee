// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access/refresh token storage.
//!
//! [`TokenStore`] is the single shared holder of the current [`TokenPair`].
//! It caches the pair in memory and writes through to a durable
//! [`KeyValueStore`] so a session survives restarts. Only login, logout, and
//! the refresh protocol write to it.

pub mod persist;

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

pub use persist::{FileStore, KeyValueStore, MemoryStore};

const ACCESS_KEY: &str = "access_token";
const REFRESH_KEY: &str = "refresh_token";

/// The credentials of one authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &if self.has_refresh_token() { "<redacted>" } else { "" })
            .finish()
    }
}

/// Shared, write-through holder of the current token pair.
///
/// The lock on the in-memory pair is only held for the swap itself; medium
/// writes happen outside it, ordered by `persist` so the medium always ends
/// up with the last pair swapped in.
pub struct TokenStore {
    current: RwLock<Option<TokenPair>>,
    persist: Mutex<()>,
    medium: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Load the persisted pair (if any) from `medium`.
    ///
    /// A pair is restored only when both keys are present and the access
    /// token is non-empty; a half-written medium reads as "no session".
    pub fn load(medium: Arc<dyn KeyValueStore>) -> Self {
        let current = match (medium.get(ACCESS_KEY), medium.get(REFRESH_KEY)) {
            (Some(access), Some(refresh)) if !access.is_empty() => {
                Some(TokenPair { access_token: access, refresh_token: refresh })
            }
            _ => None,
        };
        tracing::debug!(restored = current.is_some(), "token store loaded");
        Self { current: RwLock::new(current), persist: Mutex::new(()), medium }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStore::new()))
    }

    pub fn get(&self) -> Option<TokenPair> {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|p| p.access_token.clone())
    }

    /// True iff an access token is present. Says nothing about expiry.
    pub fn is_present(&self) -> bool {
        self.current.read().as_ref().is_some_and(|p| !p.access_token.is_empty())
    }

    /// Replace both tokens. Readers see either the old pair or the new one.
    pub fn set(&self, pair: TokenPair) {
        let _persist = self.persist.lock();
        *self.current.write() = Some(pair.clone());
        self.write_medium(Some(&pair));
    }

    /// Remove both tokens. Idempotent.
    pub fn clear(&self) {
        let _persist = self.persist.lock();
        *self.current.write() = None;
        self.write_medium(None);
    }

    /// Replace the pair only while the stored access token is still
    /// `expected_access`. Returns false (and changes nothing) otherwise.
    pub fn replace_if(&self, expected_access: &str, pair: TokenPair) -> bool {
        let _persist = self.persist.lock();
        {
            let mut current = self.current.write();
            if !holds(&current, expected_access) {
                return false;
            }
            *current = Some(pair.clone());
        }
        self.write_medium(Some(&pair));
        true
    }

    /// Clear the pair only while the stored access token is still
    /// `expected_access`. Returns false (and changes nothing) otherwise.
    pub fn clear_if(&self, expected_access: &str) -> bool {
        let _persist = self.persist.lock();
        {
            let mut current = self.current.write();
            if !holds(&current, expected_access) {
                return false;
            }
            *current = None;
        }
        self.write_medium(None);
        true
    }

    fn write_medium(&self, pair: Option<&TokenPair>) {
        let result = match pair {
            Some(pair) => self.medium.set_many(&[
                (ACCESS_KEY, pair.access_token.as_str()),
                (REFRESH_KEY, pair.refresh_token.as_str()),
            ]),
            None => self.medium.remove_many(&[ACCESS_KEY, REFRESH_KEY]),
        };
        if let Err(e) = result {
            tracing::warn!(err = %e, "failed to persist token pair");
        }
    }
}

fn holds(current: &Option<TokenPair>, expected_access: &str) -> bool {
    current.as_ref().is_some_and(|p| p.access_token == expected_access)
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").field("present", &self.is_present()).finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
