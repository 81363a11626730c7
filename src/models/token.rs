// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token model for storage.

use serde::{Deserialize, Serialize};

/// A user's UP access/refresh token pair.
///
/// One token per local user. `id` is 0 until the token has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token ID (also used as document ID)
    pub id: u64,
    /// Owning local user ID
    pub user_id: u64,
    /// Bearer token for the UP data endpoints
    pub access_token: String,
    /// Token used to obtain a new access token
    pub refresh_token: String,
    /// When the access token expires (unix seconds)
    pub expires: i64,
}

impl Token {
    /// Whether the access token expires within `margin_secs` of `now`.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        now + margin_secs >= self.expires
    }
}
