// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! `Db` is a small document store keyed by collection and document ID, backed
//! by Firestore in production or by process memory for local runs and tests.
//! Typed token/band/summary operations live in `records`.

pub mod firestore;
pub mod memory;
mod records;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::config::{Config, DbBackend};
use crate::error::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const TOKENS: &str = "up_token";
    pub const BANDS: &str = "up_band";
    pub const SUMMARIES: &str = "up_summary";
    /// Last allocated numeric ID per collection
    pub const SEQUENCES: &str = "sequences";
}

/// A scalar to filter documents on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(u64),
    Str(String),
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

/// Database handle. Cheap to clone.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

impl Db {
    /// Open the backend selected in configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        match config.db_backend {
            DbBackend::Firestore => Self::new_firestore(&config.gcp_project_id).await,
            DbBackend::Memory => {
                tracing::warn!("Using in-memory store, data will not survive a restart");
                Ok(Self::new_in_memory())
            }
        }
    }

    /// Connect to Firestore (or the emulator if FIRESTORE_EMULATOR_HOST is set).
    pub async fn new_firestore(project_id: &str) -> Result<Self> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreStore::new(project_id).await?),
        })
    }

    /// Create an empty in-memory store.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── Generic Document Operations ─────────────────────────────

    /// Fetch one document by ID.
    pub async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.get(collection, id).await,
            Backend::Memory(mem) => mem.get(collection, id),
        }
    }

    /// Write a document, replacing any existing one with the same ID.
    pub async fn set<T>(&self, collection: &str, id: &str, doc: &T) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.set(collection, id, doc).await,
            Backend::Memory(mem) => mem.set(collection, id, doc),
        }
    }

    /// Create a document. Fails with `AppError::Conflict` if the ID exists.
    pub async fn insert<T>(&self, collection: &str, id: &str, doc: &T) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.insert(collection, id, doc).await,
            Backend::Memory(mem) => mem.insert(collection, id, doc),
        }
    }

    /// All documents whose `field` equals `value`.
    pub async fn find_by<T>(&self, collection: &str, field: &str, value: FieldValue) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.find_by(collection, field, value).await,
            Backend::Memory(mem) => mem.find_by(collection, field, &value),
        }
    }

    /// Every document in a collection.
    pub async fn list_all<T>(&self, collection: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.list_all(collection).await,
            Backend::Memory(mem) => mem.list_all(collection),
        }
    }

    /// Delete one document. Deleting a missing document is not an error.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        match &self.backend {
            Backend::Firestore(fs) => fs.delete(collection, id).await,
            Backend::Memory(mem) => {
                mem.delete(collection, id);
                Ok(())
            }
        }
    }

    /// Delete several documents. Returns how many IDs were submitted.
    pub async fn delete_many(&self, collection: &str, ids: &[String]) -> Result<usize> {
        match &self.backend {
            Backend::Firestore(fs) => fs.batch_delete(collection, ids).await?,
            Backend::Memory(mem) => {
                for id in ids {
                    mem.delete(collection, id);
                }
            }
        }
        Ok(ids.len())
    }
}

/// Map a storage error that is not a key conflict.
pub(crate) fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}
