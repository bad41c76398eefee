// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tally: client for a personal-finance tracker backend.
//!
//! The library owns the two pieces every front end needs: an authenticated
//! request client with a single-flight token refresh protocol
//! ([`request::AuthClient`]) and the report aggregation used by the summary
//! and monthly views ([`aggregate`]). [`session::Session`] composes them with
//! the persistent [`token::TokenStore`].

pub mod aggregate;
pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod request;
pub mod session;
pub mod token;

#[cfg(test)]
pub mod test_support;

use std::sync::Once;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
