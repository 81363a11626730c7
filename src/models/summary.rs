// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity summary model for storage, and the raw UP item it is built from.

use serde::{Deserialize, Serialize};

/// Stored summary record, keyed by the UP external ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// UP external ID (unique across all summaries)
    pub xid: String,
    /// Owning band ID
    pub band_id: u64,
    /// Unix seconds
    pub updated: i64,
    /// Unix seconds
    pub created: i64,
    /// Unix seconds
    pub completed: i64,
    /// Category type ("move", "sleep", "mood", "goal")
    #[serde(rename = "type")]
    pub summary_type: String,
    pub sub_type: u32,
    pub title: String,
    /// Snapshot image path, empty if the item had none
    pub snapshot_image: String,
    /// Image path, empty if the item had none
    pub image: String,
}

/// One item as returned by a UP list endpoint.
///
/// Everything except `xid` is optional; the vendor omits fields freely.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSummaryItem {
    pub xid: String,
    #[serde(default)]
    pub time_updated: Option<i64>,
    #[serde(default)]
    pub time_created: Option<i64>,
    #[serde(default)]
    pub time_completed: Option<i64>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub sub_type: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snapshot_image: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// A summary given either by key or by value.
pub enum SummaryRef<'a> {
    Xid(&'a str),
    Summary(&'a Summary),
}

impl SummaryRef<'_> {
    pub fn xid(&self) -> &str {
        match self {
            SummaryRef::Xid(xid) => xid,
            SummaryRef::Summary(s) => &s.xid,
        }
    }
}

impl<'a> From<&'a str> for SummaryRef<'a> {
    fn from(xid: &'a str) -> Self {
        SummaryRef::Xid(xid)
    }
}

impl<'a> From<&'a Summary> for SummaryRef<'a> {
    fn from(summary: &'a Summary) -> Self {
        SummaryRef::Summary(summary)
    }
}

/// A band given either by ID or by value.
pub enum BandRef<'a> {
    Id(u64),
    Band(&'a crate::models::Band),
}

impl BandRef<'_> {
    pub fn id(&self) -> u64 {
        match self {
            BandRef::Id(id) => *id,
            BandRef::Band(b) => b.id,
        }
    }
}

impl From<u64> for BandRef<'_> {
    fn from(id: u64) -> Self {
        BandRef::Id(id)
    }
}

impl<'a> From<&'a crate::models::Band> for BandRef<'a> {
    fn from(band: &'a crate::models::Band) -> Self {
        BandRef::Band(band)
    }
}
