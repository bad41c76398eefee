// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Session lifecycle events broadcast to subscribers (navigation, UI, logs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A login stored a fresh token pair.
    LoggedIn,
    /// The user logged out locally.
    LoggedOut,
    /// The refresh protocol minted a new access token.
    Refreshed,
    /// The session could not be recovered and the tokens were cleared.
    /// Subscribers should send the user back to the login entry point.
    SessionEnded { reason: String },
}

/// Capacity of the session event channel.
pub const EVENT_CAPACITY: usize = 64;
