// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations for tokens, bands and summaries.

use super::{collections, Db, FieldValue};
use crate::error::{AppError, Result};
use crate::models::{Band, Summary, Token};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Give up allocating an ID after this many collisions in a row.
const MAX_ID_ATTEMPTS: usize = 16;

/// Last allocated ID for one collection.
#[derive(Debug, Serialize, Deserialize)]
struct Sequence {
    last: u64,
}

/// Document ID for a summary. XIDs come from the vendor, so keep them path-safe.
pub(crate) fn summary_doc_id(xid: &str) -> String {
    urlencoding::encode(xid).into_owned()
}

impl Db {
    /// Insert a record under the next free numeric ID and return that ID.
    ///
    /// The sequence document is only a hint: the create-only insert is what
    /// guarantees uniqueness, so a stale hint just costs another attempt.
    async fn insert_with_new_id<T, F>(&self, collection: &str, build: F) -> Result<u64>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn(u64) -> T,
    {
        let mut candidate = self
            .get::<Sequence>(collections::SEQUENCES, collection)
            .await?
            .map_or(0, |s| s.last)
            + 1;

        for _ in 0..MAX_ID_ATTEMPTS {
            let record = build(candidate);
            match self.insert(collection, &candidate.to_string(), &record).await {
                Ok(()) => {
                    self.set(
                        collections::SEQUENCES,
                        collection,
                        &Sequence { last: candidate },
                    )
                    .await?;
                    return Ok(candidate);
                }
                Err(AppError::Conflict(_)) => candidate += 1,
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Database(format!(
            "Could not allocate an ID in {} after {} attempts",
            collection, MAX_ID_ATTEMPTS
        )))
    }

    // ─── Token Operations ────────────────────────────────────────

    pub async fn get_token(&self, id: u64) -> Result<Option<Token>> {
        self.get(collections::TOKENS, &id.to_string()).await
    }

    pub async fn get_token_by_user(&self, user_id: u64) -> Result<Option<Token>> {
        let tokens: Vec<Token> = self
            .find_by(collections::TOKENS, "user_id", FieldValue::Int(user_id))
            .await?;
        Ok(tokens.into_iter().min_by_key(|t| t.id))
    }

    /// Insert a new token, assigning `token.id`.
    pub async fn insert_token(&self, token: &mut Token) -> Result<u64> {
        let template = token.clone();
        let id = self
            .insert_with_new_id(collections::TOKENS, |id| Token {
                id,
                ..template.clone()
            })
            .await?;
        token.id = id;
        Ok(id)
    }

    /// Overwrite the token stored under `token.id`.
    pub async fn set_token(&self, token: &Token) -> Result<()> {
        self.set(collections::TOKENS, &token.id.to_string(), token)
            .await
    }

    pub async fn delete_token(&self, id: u64) -> Result<()> {
        self.delete(collections::TOKENS, &id.to_string()).await
    }

    // ─── Band Operations ─────────────────────────────────────────

    pub async fn get_band(&self, id: u64) -> Result<Option<Band>> {
        self.get(collections::BANDS, &id.to_string()).await
    }

    pub async fn get_band_by_xid(&self, xid: &str) -> Result<Option<Band>> {
        let bands: Vec<Band> = self
            .find_by(collections::BANDS, "xid", FieldValue::from(xid))
            .await?;
        Ok(bands.into_iter().min_by_key(|b| b.id))
    }

    pub async fn get_band_by_user(&self, user_id: u64) -> Result<Option<Band>> {
        let bands: Vec<Band> = self
            .find_by(collections::BANDS, "user_id", FieldValue::Int(user_id))
            .await?;
        Ok(bands.into_iter().min_by_key(|b| b.id))
    }

    /// All bands, ordered by ID.
    pub async fn list_bands(&self) -> Result<Vec<Band>> {
        let mut bands: Vec<Band> = self.list_all(collections::BANDS).await?;
        bands.sort_by_key(|b| b.id);
        Ok(bands)
    }

    /// Insert a new band, assigning `band.id`.
    pub async fn insert_band(&self, band: &mut Band) -> Result<u64> {
        let template = band.clone();
        let id = self
            .insert_with_new_id(collections::BANDS, |id| Band {
                id,
                ..template.clone()
            })
            .await?;
        band.id = id;
        Ok(id)
    }

    pub async fn set_band(&self, band: &Band) -> Result<()> {
        self.set(collections::BANDS, &band.id.to_string(), band)
            .await
    }

    pub async fn delete_band(&self, id: u64) -> Result<()> {
        self.delete(collections::BANDS, &id.to_string()).await
    }

    // ─── Summary Operations ──────────────────────────────────────

    pub async fn get_summary(&self, xid: &str) -> Result<Option<Summary>> {
        self.get(collections::SUMMARIES, &summary_doc_id(xid)).await
    }

    /// Create-only write keyed by XID; `AppError::Conflict` if it exists.
    pub async fn insert_summary(&self, summary: &Summary) -> Result<()> {
        self.insert(collections::SUMMARIES, &summary_doc_id(&summary.xid), summary)
            .await
    }

    /// Overwrite the summary stored under its XID.
    pub async fn set_summary(&self, summary: &Summary) -> Result<()> {
        self.set(collections::SUMMARIES, &summary_doc_id(&summary.xid), summary)
            .await
    }

    /// Summaries of a band, most recently created first.
    pub async fn get_summaries_for_band(&self, band_id: u64) -> Result<Vec<Summary>> {
        let mut summaries: Vec<Summary> = self
            .find_by(collections::SUMMARIES, "band_id", FieldValue::Int(band_id))
            .await?;
        summaries.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.xid.cmp(&b.xid)));
        Ok(summaries)
    }

    pub async fn delete_summary(&self, xid: &str) -> Result<()> {
        self.delete(collections::SUMMARIES, &summary_doc_id(xid))
            .await
    }

    /// Delete every summary of a band. Returns the number deleted.
    pub async fn delete_summaries_for_band(&self, band_id: u64) -> Result<usize> {
        let summaries: Vec<Summary> = self
            .find_by(collections::SUMMARIES, "band_id", FieldValue::Int(band_id))
            .await?;
        let ids: Vec<String> = summaries.iter().map(|s| summary_doc_id(&s.xid)).collect();
        self.delete_many(collections::SUMMARIES, &ids).await
    }
}
