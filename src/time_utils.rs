// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format unix seconds as RFC3339 with a `Z` suffix.
///
/// Zero means "not set" in stored summaries and maps to `None`, as does any
/// value outside chrono's range.
pub fn unix_to_rfc3339(secs: i64) -> Option<String> {
    if secs == 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(secs, 0).map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
}
