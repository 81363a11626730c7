// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod sync;
pub mod up;

pub use sync::{normalize_summary, SyncService, UpsertOutcome};
pub use up::{UpClient, UpService};
