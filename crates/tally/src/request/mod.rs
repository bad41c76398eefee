// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP requests.
//!
//! [`AuthClient`] issues [`ApiRequest`]s with the stored bearer token and
//! resolves each one to a [`RequestOutcome`]. A 401 enters the single-flight
//! refresh protocol in [`refresh`]; at most one retry per request follows.

pub mod client;
pub mod refresh;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, FailureDetail};

pub use client::AuthClient;
pub use refresh::RefreshPhase;

/// One backend call, independent of any token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add an extra header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::debug!(name, "dropping invalid request header"),
        }
        self
    }
}

/// A decoded success response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `null` when empty, a JSON string when not JSON.
    pub body: serde_json::Value,
}

/// Final result of [`AuthClient::request`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(ApiResponse),
    /// Token refresh failed, a retried call was rejected again, or no refresh
    /// token existed. The session has been cleared.
    AuthExpiredUnrecoverable,
    Failure(FailureDetail),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Decode a success body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Self::Success(resp) => serde_json::from_value(resp.body)
                .map_err(|e| ApiError::Failure(FailureDetail::decode(resp.status, e.to_string()))),
            Self::AuthExpiredUnrecoverable => Err(ApiError::SessionEnded),
            Self::Failure(detail) => Err(ApiError::Failure(detail)),
        }
    }

    /// Discard a success body (e.g. `204 No Content` deletes).
    pub fn into_unit(self) -> Result<(), ApiError> {
        match self {
            Self::Success(_) => Ok(()),
            Self::AuthExpiredUnrecoverable => Err(ApiError::SessionEnded),
            Self::Failure(detail) => Err(ApiError::Failure(detail)),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
