// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message used when a failure body is not JSON at all.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Failure categories surfaced to callers of the request client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network unreachable, connection reset, or timeout. No HTTP status.
    Transport,
    /// Non-401 4xx response, usually with a `detail` message worth showing.
    Validation,
    /// 5xx response (or anything else outside 2xx/4xx).
    Server,
    /// 401 outside the refresh protocol (e.g. wrong password at login).
    Unauthorized,
    /// A success response whose body did not match the expected shape.
    Decode,
}

impl ErrorKind {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            400..=499 => Self::Validation,
            _ => Self::Server,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::Validation => "VALIDATION",
            Self::Server => "SERVER",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Decode => "DECODE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request failure as seen by the caller: category, optional HTTP status,
/// and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl FailureDetail {
    /// Failure for a request that never produced an HTTP response.
    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        Self { kind: ErrorKind::Transport, status: None, message }
    }

    /// Failure built from a non-success response body.
    ///
    /// A JSON body without a usable `detail` yields `HTTP <status>`; a body
    /// that is not JSON at all yields [`UNKNOWN_ERROR`].
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => detail_of(&value).unwrap_or_else(|| format!("HTTP {status}")),
            Err(_) => UNKNOWN_ERROR.to_owned(),
        };
        Self { kind: ErrorKind::from_status(status), status: Some(status), message }
    }

    /// Failure for a success response that could not be decoded.
    pub fn decode(status: u16, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, status: Some(status), message: message.into() }
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for FailureDetail {}

/// Pull the server-provided `detail` message out of an error body.
///
/// Accepts `{"detail": "..."}` and the validation-error form
/// `{"detail": [{"msg": "..."}, ...]}`. Returns `None` for anything else.
pub fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    detail_of(&value)
}

fn detail_of(value: &serde_json::Value) -> Option<String> {
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> =
                items.iter().filter_map(|item| item.get("msg").and_then(|m| m.as_str())).collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

/// Error type of the typed API layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The session could not be recovered; the caller must log in again.
    SessionEnded,
    /// The request failed; see the detail.
    Failure(FailureDetail),
}

impl ApiError {
    pub fn failure(&self) -> Option<&FailureDetail> {
        match self {
            Self::SessionEnded => None,
            Self::Failure(detail) => Some(detail),
        }
    }
}

impl From<FailureDetail> for ApiError {
    fn from(detail: FailureDetail) -> Self {
        Self::Failure(detail)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionEnded => f.write_str("session ended"),
            Self::Failure(detail) => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
