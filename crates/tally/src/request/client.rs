// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client that attaches the session's bearer token and owns the
//! 401 -> refresh -> retry-once protocol.

use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::error::FailureDetail;
use crate::event::SessionEvent;
use crate::request::refresh::{end_session, Recovery, RefreshContext, RefreshGate};
use crate::request::{ApiRequest, ApiResponse, RefreshPhase, RequestOutcome};
use crate::token::TokenStore;

/// Authenticated request client. Cheap to clone; clones share the token
/// store, the refresh gate, and the event channel.
#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    ctx: Arc<RefreshContext>,
    gate: Arc<RefreshGate>,
}

/// Result of one HTTP exchange before outcome mapping.
enum Attempt {
    Unauthorized,
    Done(RequestOutcome),
}

impl AuthClient {
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<TokenStore>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> anyhow::Result<Self> {
        crate::ensure_crypto();
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let ctx = RefreshContext {
            http,
            refresh_url: format!("{base_url}/refresh"),
            tokens,
            event_tx,
        };
        Ok(Self { base_url, ctx: Arc::new(ctx), gate: Arc::new(RefreshGate::new()) })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.ctx.http
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.ctx.tokens
    }

    pub fn events(&self) -> &broadcast::Sender<SessionEvent> {
        &self.ctx.event_tx
    }

    pub fn phase(&self) -> RefreshPhase {
        self.gate.phase()
    }

    /// Number of `/refresh` calls this client (and its clones) have issued.
    pub fn refresh_count(&self) -> u64 {
        self.gate.refresh_count()
    }

    /// Issue `req`, recovering from one expired access token.
    ///
    /// Non-401 failures are returned as-is without retry. A 401 enters the
    /// refresh protocol; the original call is retried at most once, and a
    /// second 401 ends the session.
    pub async fn request(&self, req: &ApiRequest) -> RequestOutcome {
        let sent_with = self.ctx.tokens.access_token();
        match self.attempt(req, sent_with.as_deref()).await {
            Attempt::Done(outcome) => return outcome,
            Attempt::Unauthorized => {}
        }

        tracing::debug!(method = %req.method, path = %req.path, "request unauthorized");
        let token = match self.gate.recover(&self.ctx, sent_with.as_deref()).await {
            Recovery::Retry(token) => token,
            Recovery::Unrecoverable => return RequestOutcome::AuthExpiredUnrecoverable,
        };

        match self.attempt(req, Some(&token)).await {
            Attempt::Done(outcome) => outcome,
            Attempt::Unauthorized => {
                let reason = "request rejected after token refresh";
                end_session(&self.ctx, Some(token.as_str()), reason);
                RequestOutcome::AuthExpiredUnrecoverable
            }
        }
    }

    async fn attempt(&self, req: &ApiRequest, token: Option<&str>) -> Attempt {
        let mut builder = self.ctx.http.request(req.method.clone(), self.url(&req.path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }
        if !req.headers.is_empty() {
            builder = builder.headers(req.headers.clone());
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(path = %req.path, err = %e, "transport error");
                return Attempt::Done(RequestOutcome::Failure(FailureDetail::transport(&e)));
            }
        };

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Attempt::Unauthorized;
        }
        Attempt::Done(map_response(resp).await)
    }
}

/// Map a non-401 response to its outcome.
pub(crate) async fn map_response(resp: reqwest::Response) -> RequestOutcome {
    let status = resp.status();
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(e) => return RequestOutcome::Failure(FailureDetail::transport(&e)),
    };

    if !status.is_success() {
        return RequestOutcome::Failure(FailureDetail::from_response(status.as_u16(), &bytes));
    }

    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    RequestOutcome::Success(ApiResponse { status: status.as_u16(), body })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
