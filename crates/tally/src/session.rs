// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login, logout, and session state on top of the request client.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::api::FinanceApi;
use crate::config::ClientConfig;
use crate::error::{ApiError, FailureDetail};
use crate::event::{SessionEvent, EVENT_CAPACITY};
use crate::model::{Credentials, TokenResponse, UserProfile};
use crate::request::client::map_response;
use crate::request::AuthClient;
use crate::token::{FileStore, TokenPair, TokenStore};

/// An authenticated session with the tracker backend.
///
/// Owns the token store and the event channel. Subscribers see every
/// [`SessionEvent`]; a `SessionEnded` is the signal to return to login.
pub struct Session {
    client: AuthClient,
    tokens: Arc<TokenStore>,
}

impl Session {
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> anyhow::Result<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let client = AuthClient::new(config, Arc::clone(&tokens), event_tx)?;
        Ok(Self { client, tokens })
    }

    /// Session persisted to the configured token file.
    pub fn open(config: &ClientConfig) -> anyhow::Result<Self> {
        let medium = Arc::new(FileStore::new(config.token_path()));
        Self::new(config, Arc::new(TokenStore::load(medium)))
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn api(&self) -> FinanceApi {
        FinanceApi::new(self.client.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.client.events().subscribe()
    }

    /// True iff an access token is stored. Says nothing about expiry.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_present()
    }

    /// Exchange credentials for a token pair at `POST /token`.
    ///
    /// On failure the store is left untouched and the server's detail is
    /// returned in the [`FailureDetail`].
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let form = [
            ("username", credentials.identifier.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let resp = self
            .client
            .http()
            .post(self.client.url("/token"))
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::Failure(FailureDetail::transport(&e)))?;
        let status = resp.status().as_u16();

        let token: TokenResponse = map_response(resp).await.into_json()?;
        if token.access_token.is_empty() {
            return Err(FailureDetail::decode(status, "empty access token").into());
        }
        if token.refresh_token.is_none() {
            tracing::warn!("login response carried no refresh token");
        }

        self.tokens.set(TokenPair::new(token.access_token, token.refresh_token.unwrap_or_default()));
        tracing::info!(user = %credentials.identifier, "logged in");
        let _ = self.client.events().send(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Forget the stored tokens locally.
    pub fn logout(&self) {
        self.tokens.clear();
        tracing::info!("logged out");
        let _ = self.client.events().send(SessionEvent::LoggedOut);
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.api().me().await
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
