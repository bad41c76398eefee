// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight access token refresh.
//!
//! The gate is a three-state machine guarded by a mutex:
//!
//! - `Idle`: the first request to observe a 401 becomes the leader. It moves
//!   the gate to `Refreshing` and spawns exactly one `POST /refresh`.
//! - `Refreshing`: later 401s subscribe to the in-flight refresh instead of
//!   starting their own, and suspend until it settles.
//! - `Failed`: the refresh was rejected. New 401s resolve immediately as
//!   unrecoverable while waiters are being notified, then the gate returns
//!   to `Idle` so a fresh login can start a new session.
//!
//! The mutex is never held across an await point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::event::SessionEvent;
use crate::token::{TokenPair, TokenStore};

/// Externally visible phase of the refresh gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
    Failed,
}

/// How an in-flight refresh settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Settled {
    /// New access token to retry with.
    Refreshed(String),
    Failed,
}

/// What a request that saw a 401 should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recovery {
    /// Retry the original call once with this access token.
    Retry(String),
    Unrecoverable,
}

enum GateState {
    Idle,
    Refreshing(watch::Receiver<Option<Settled>>),
    Failed,
}

/// `POST /refresh` request body.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// `POST /refresh` success body. The refresh token is optional: backends
/// that do not rotate it only return a new access token.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Everything the spawned refresh task needs, detached from the caller.
#[derive(Clone)]
pub(crate) struct RefreshContext {
    pub http: reqwest::Client,
    pub refresh_url: String,
    pub tokens: Arc<TokenStore>,
    pub event_tx: broadcast::Sender<SessionEvent>,
}

/// Coordinates token refresh across all concurrent requests of one client.
pub struct RefreshGate {
    state: Mutex<GateState>,
    refreshes: AtomicU64,
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self { state: Mutex::new(GateState::Idle), refreshes: AtomicU64::new(0) }
    }

    pub fn phase(&self) -> RefreshPhase {
        match *self.state.lock() {
            GateState::Idle => RefreshPhase::Idle,
            GateState::Refreshing(_) => RefreshPhase::Refreshing,
            GateState::Failed => RefreshPhase::Failed,
        }
    }

    /// Number of `/refresh` calls issued through this gate.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Recover from a 401 that was produced by `sent_with` (the access token
    /// the failed request carried, if any).
    pub(crate) async fn recover(
        self: &Arc<Self>,
        ctx: &RefreshContext,
        sent_with: Option<&str>,
    ) -> Recovery {
        let mut rx = {
            let mut state = self.state.lock();
            let in_flight = match &*state {
                GateState::Refreshing(rx) => Some(rx.clone()),
                GateState::Failed => return Recovery::Unrecoverable,
                GateState::Idle => None,
            };
            match in_flight {
                Some(rx) => {
                    tracing::debug!("refresh in flight, waiting");
                    rx
                }
                None => {
                    let current = ctx.tokens.get();
                    // A refresh completed after this request was sent.
                    if let Some(ref pair) = current {
                        if sent_with != Some(pair.access_token.as_str()) {
                            tracing::debug!("401 carried a superseded token, retrying");
                            return Recovery::Retry(pair.access_token.clone());
                        }
                    }
                    let pair = match current {
                        Some(pair) if pair.has_refresh_token() => pair,
                        other => {
                            drop(state);
                            let ended = other.as_ref().map(|p| p.access_token.as_str());
                            end_session(ctx, ended, "no refresh token");
                            return Recovery::Unrecoverable;
                        }
                    };
                    let (tx, rx) = watch::channel(None);
                    *state = GateState::Refreshing(rx.clone());
                    self.refreshes.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("access token rejected, starting refresh");
                    self.spawn_refresh(ctx, pair, tx);
                    rx
                }
            }
        };

        let recovery = match rx.wait_for(Option::is_some).await {
            Ok(settled) => match &*settled {
                Some(Settled::Refreshed(token)) => Recovery::Retry(token.clone()),
                _ => Recovery::Unrecoverable,
            },
            // The refresh task vanished without settling (runtime shutdown).
            Err(_) => Recovery::Unrecoverable,
        };
        recovery
    }

    /// Run the refresh on its own task. The result is only applied while the
    /// store still holds the pair the refresh started from; a logout or login
    /// in the meantime wins, and waiters resolve as unrecoverable.
    fn spawn_refresh(
        self: &Arc<Self>,
        ctx: &RefreshContext,
        pair: TokenPair,
        tx: watch::Sender<Option<Settled>>,
    ) {
        let gate = Arc::clone(self);
        let ctx = ctx.clone();

        tokio::spawn(async move {
            match do_refresh(&ctx.http, &ctx.refresh_url, &pair.refresh_token).await {
                Ok(resp) => {
                    let refresh_token = resp.refresh_token.unwrap_or(pair.refresh_token);
                    let access = resp.access_token.clone();
                    let next = TokenPair { access_token: resp.access_token, refresh_token };
                    let settled = if ctx.tokens.replace_if(&pair.access_token, next) {
                        tracing::info!("access token refreshed");
                        let _ = ctx.event_tx.send(SessionEvent::Refreshed);
                        Settled::Refreshed(access)
                    } else {
                        tracing::info!("session changed during refresh, discarding new token");
                        Settled::Failed
                    };
                    *gate.state.lock() = GateState::Idle;
                    let _ = tx.send(Some(settled));
                }
                Err(e) => {
                    *gate.state.lock() = GateState::Failed;
                    tracing::warn!(err = %e, "token refresh failed");
                    end_session(&ctx, Some(pair.access_token.as_str()), &e.to_string());
                    let _ = tx.send(Some(Settled::Failed));
                    *gate.state.lock() = GateState::Idle;
                }
            }
        });
    }
}

/// Clear the session and tell subscribers it is over.
///
/// `ended` is the access token of the session being ended. When the store
/// has moved on to another session since, it is left alone and no event is
/// sent. `None` means no session was stored to begin with.
pub(crate) fn end_session(ctx: &RefreshContext, ended: Option<&str>, reason: &str) {
    if let Some(access) = ended {
        if !ctx.tokens.clear_if(access) {
            tracing::debug!(reason, "session already replaced, not ending it");
            return;
        }
    }
    tracing::warn!(reason, "session ended");
    let _ = ctx.event_tx.send(SessionEvent::SessionEnded { reason: reason.to_owned() });
}

/// Perform a single token refresh request.
pub async fn do_refresh(
    client: &reqwest::Client,
    refresh_url: &str,
    refresh_token: &str,
) -> anyhow::Result<RefreshResponse> {
    let resp = client.post(refresh_url).json(&RefreshRequest { refresh_token }).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("refresh failed ({status}): {text}");
    }

    let token: RefreshResponse = resp.json().await?;
    if token.access_token.is_empty() {
        anyhow::bail!("refresh returned an empty access token");
    }
    Ok(token)
}
