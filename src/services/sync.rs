// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Summary synchronization.
//!
//! Handles the core workflow:
//! 1. Get a valid access token for the user (refreshing if needed)
//! 2. Fetch one page of items per enabled category
//! 3. Normalize each item into a `Summary`
//! 4. Upsert it keyed by XID

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{
    normalize_type, Band, BandRef, Category, CategoryCatalog, RawSummaryItem, Summary, SummaryRef,
};
use crate::services::UpService;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Turn a raw UP item into a summary for `band`.
///
/// Explicit values from the item win; otherwise `type` comes from
/// `declared_type`, `sub_type` is 0 and image paths are empty. Either way the
/// type is normalized so vendor plurals ("sleeps") are stored as the key.
pub fn normalize_summary(raw: &RawSummaryItem, declared_type: &str, band: &Band) -> Summary {
    let raw_type = raw
        .item_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(declared_type);

    Summary {
        xid: raw.xid.clone(),
        band_id: band.id,
        updated: raw.time_updated.unwrap_or(0),
        created: raw.time_created.unwrap_or(0),
        completed: raw.time_completed.unwrap_or(0),
        summary_type: normalize_type(raw_type).to_string(),
        sub_type: raw.sub_type.unwrap_or(0),
        title: raw.title.clone().unwrap_or_default(),
        snapshot_image: non_empty_or_default(raw.snapshot_image.as_deref()),
        image: non_empty_or_default(raw.image.as_deref()),
    }
}

fn non_empty_or_default(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_default().to_string()
}

/// Whether an upsert created or replaced the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Counts for one synced category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategorySyncResult {
    pub category: String,
    pub fetched: u32,
    pub inserted: u32,
    pub updated: u32,
}

/// What `disconnect` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DisconnectResult {
    pub token_deleted: bool,
    pub band_deleted: bool,
    pub summaries_deleted: usize,
}

/// Synchronizes UP items into stored summaries.
#[derive(Clone)]
pub struct SyncService {
    up: UpService,
    db: Db,
    catalog: Arc<CategoryCatalog>,
}

impl SyncService {
    pub fn new(up: UpService, db: Db, catalog: Arc<CategoryCatalog>) -> Self {
        Self { up, db, catalog }
    }

    // ─── Summary Persistence ─────────────────────────────────────

    /// Insert the summary, or overwrite it if its XID is already stored.
    ///
    /// The insert is create-only; a duplicate key is retried once as an
    /// update of the same XID, so repeated syncs converge on the latest values.
    pub async fn upsert_summary(&self, summary: &Summary) -> Result<UpsertOutcome> {
        match self.db.insert_summary(summary).await {
            Ok(()) => Ok(UpsertOutcome::Inserted),
            Err(AppError::Conflict(_)) => {
                tracing::debug!(xid = %summary.xid, "Summary exists, updating");
                self.db.set_summary(summary).await?;
                Ok(UpsertOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn load_summary(&self, xid: &str) -> Result<Option<Summary>> {
        self.db.get_summary(xid).await
    }

    /// Stored summaries for a band, optionally of one type, newest first.
    pub async fn list_summaries(
        &self,
        band_id: u64,
        summary_type: Option<&str>,
    ) -> Result<Vec<Summary>> {
        let summaries = self.db.get_summaries_for_band(band_id).await?;
        Ok(match summary_type {
            Some(t) => summaries
                .into_iter()
                .filter(|s| s.summary_type == t)
                .collect(),
            None => summaries,
        })
    }

    pub async fn delete_summary<'a>(&self, summary: impl Into<SummaryRef<'a>>) -> Result<()> {
        let summary = summary.into();
        self.db.delete_summary(summary.xid()).await
    }

    /// Delete every summary of a band. Returns the number deleted.
    pub async fn delete_summaries_by_band<'a>(&self, band: impl Into<BandRef<'a>>) -> Result<usize> {
        let band_id = band.into().id();
        let count = self.db.delete_summaries_for_band(band_id).await?;
        tracing::debug!(band_id, count, "Deleted summaries for band");
        Ok(count)
    }

    /// Delete every summary of the user's band. A user without a band has none.
    pub async fn delete_summaries_by_user(&self, user_id: u64) -> Result<usize> {
        match self.up.load_band_by_user(user_id).await? {
            Some(band) => self.delete_summaries_by_band(&band).await,
            None => Ok(0),
        }
    }

    // ─── Sync ────────────────────────────────────────────────────

    /// Fetch one page of a category and upsert every item.
    pub async fn sync_category(
        &self,
        user_id: u64,
        category: &Category,
        limit: u32,
    ) -> Result<CategorySyncResult> {
        if !category.has_summaries() {
            return Err(AppError::BadRequest(format!(
                "Category '{}' has no summaries to sync",
                category.key
            )));
        }

        let band = self
            .up
            .load_band_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Band for user {}", user_id)))?;

        let access_token = self.up.get_valid_access_token(user_id).await?;
        let items = self
            .up
            .client()
            .list_items(&access_token, category.endpoint, limit)
            .await?;

        let mut result = CategorySyncResult {
            category: category.key.to_string(),
            fetched: items.len() as u32,
            ..Default::default()
        };

        // In page order, so a repeated XID ends with its last values
        for item in &items {
            let summary = normalize_summary(item, category.key, &band);
            match self.upsert_summary(&summary).await? {
                UpsertOutcome::Inserted => result.inserted += 1,
                UpsertOutcome::Updated => result.updated += 1,
            }
        }

        tracing::info!(
            user_id,
            category = category.key,
            fetched = result.fetched,
            inserted = result.inserted,
            updated = result.updated,
            "Category synced"
        );

        Ok(result)
    }

    /// Sync every enabled category that produces summaries.
    ///
    /// Stops at the first failing category; what was already upserted stays.
    pub async fn sync_enabled(&self, user_id: u64, limit: u32) -> Result<Vec<CategorySyncResult>> {
        let mut results = Vec::new();
        for category in self.catalog.syncable() {
            results.push(self.sync_category(user_id, category, limit).await?);
        }
        Ok(results)
    }

    // ─── Disconnect ──────────────────────────────────────────────

    /// Unlink the user: revoke with UP, then delete summaries, band and token.
    pub async fn disconnect(&self, user_id: u64) -> Result<DisconnectResult> {
        let token_deleted = self.up.revoke(user_id).await?;

        let mut result = DisconnectResult {
            token_deleted,
            ..Default::default()
        };

        if let Some(band) = self.up.load_band_by_user(user_id).await? {
            result.summaries_deleted = self.delete_summaries_by_band(&band).await?;
            self.up.delete_band(band.id).await?;
            result.band_deleted = true;
        }

        tracing::info!(
            user_id,
            token_deleted = result.token_deleted,
            band_deleted = result.band_deleted,
            summaries_deleted = result.summaries_deleted,
            "User disconnected from UP"
        );

        Ok(result)
    }
}
