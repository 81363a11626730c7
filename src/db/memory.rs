// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Documents are kept as JSON values so the serde shape matches what
//! Firestore would store.

use super::FieldValue;
use crate::error::{AppError, Result};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Collections of JSON documents keyed by ID.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
            .map(decode)
            .transpose()
    }

    pub fn set<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<()> {
        let value = encode(doc)?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    pub fn insert<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<()> {
        let value = encode(doc)?;
        // The shard lock is held across the check and the write.
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(AppError::Conflict(format!("{}/{}", collection, id)));
        }
        docs.insert(id.to_string(), value);
        Ok(())
    }

    pub fn find_by<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<T>> {
        let wanted = match value {
            FieldValue::Int(n) => Value::from(*n),
            FieldValue::Str(s) => Value::from(s.as_str()),
        };

        let matches: Vec<Value> = match self.collections.get(collection) {
            Some(docs) => docs
                .values()
                .filter(|doc| doc.get(field) == Some(&wanted))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        matches.into_iter().map(decode).collect()
    }

    pub fn list_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let docs: Vec<Value> = match self.collections.get(collection) {
            Some(docs) => docs.values().cloned().collect(),
            None => Vec::new(),
        };
        docs.into_iter().map(decode).collect()
    }

    pub fn delete(&self, collection: &str, id: &str) {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
    }

    #[cfg(test)]
    fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |docs| docs.len())
    }
}

fn encode<T: Serialize>(doc: &T) -> Result<Value> {
    serde_json::to_value(doc)
        .map_err(|e| AppError::Database(format!("Failed to serialize document: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Failed to deserialize document: {}", e)))
}
