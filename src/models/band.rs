// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked UP band (vendor account) model.

use serde::{Deserialize, Serialize};

/// The UP account a local user has linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    /// Band ID (also used as document ID), 0 until saved
    pub id: u64,
    /// UP external ID of the account
    pub xid: String,
    /// Owning local user ID
    pub user_id: u64,
    pub first_name: String,
    pub last_name: String,
    /// Profile image URL
    pub image_url: String,
}
