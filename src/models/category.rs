// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog of supported UP categories.
//!
//! The table is static; which categories are enabled comes from configuration.
//! A `CategoryCatalog` is built once at startup and shared read-only.

use serde::Serialize;

/// A labelled sub-type of a category (e.g. sleep 1 = "Power nap").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubType {
    pub id: u32,
    pub label: &'static str,
}

const MOOD_SUB_TYPES: &[SubType] = &[
    SubType { id: 1, label: "Amazing" },
    SubType { id: 2, label: "Pumped UP" },
    SubType { id: 3, label: "Energized" },
    SubType { id: 4, label: "Good" },
    SubType { id: 5, label: "Meh" },
    SubType { id: 6, label: "Dragging" },
    SubType { id: 7, label: "Exhausted" },
    SubType { id: 8, label: "Totally done" },
];

const SLEEP_SUB_TYPES: &[SubType] = &[
    SubType { id: 0, label: "Normal" },
    SubType { id: 1, label: "Power nap" },
    SubType { id: 2, label: "Nap" },
];

/// Metadata for one UP category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Type key stored on summaries ("sleep", "move", ...)
    #[serde(rename = "type")]
    pub key: &'static str,
    /// Path segment under `/users/@me/` (empty for the user profile)
    pub endpoint: &'static str,
    /// OAuth scope required to read it
    pub scope: &'static str,
    pub title: &'static str,
    pub sub_types: &'static [SubType],
    pub enabled: bool,
}

impl Category {
    /// Whether items of this category are mirrored as summaries.
    pub fn has_summaries(&self) -> bool {
        self.key != "user"
    }

    pub fn sub_type_label(&self, sub_type: u32) -> Option<&'static str> {
        self.sub_types
            .iter()
            .find(|s| s.id == sub_type)
            .map(|s| s.label)
    }
}

/// (key, endpoint, scope, title, sub-types)
const CATEGORY_TABLE: &[(&str, &str, &str, &str, &[SubType])] = &[
    ("user", "", "basic_read", "User", &[]),
    ("goal", "goals", "extended_read", "Goals", &[]),
    ("mood", "mood", "mood_read", "Mood", MOOD_SUB_TYPES),
    ("move", "moves", "move_read", "Moves", &[]),
    ("sleep", "sleeps", "sleep_read", "Sleep", SLEEP_SUB_TYPES),
];

/// Vendor type codes that differ from our category keys.
const TYPE_ALIASES: &[(&str, &str)] = &[("sleeps", "sleep")];

/// Map a vendor type code to the stored category key.
pub fn normalize_type(type_code: &str) -> &str {
    TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == type_code)
        .map(|(_, key)| *key)
        .unwrap_or(type_code)
}

/// Result of a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry<'a> {
    All(Vec<&'a Category>),
    Category(&'a Category),
    SubType(&'static str),
}

/// Immutable category catalog.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl Default for CategoryCatalog {
    /// All categories enabled.
    fn default() -> Self {
        Self::new(None)
    }
}

impl CategoryCatalog {
    /// Build the catalog. `enabled` lists the enabled keys; `None` enables all.
    ///
    /// The `user` category is always enabled since linking needs `basic_read`.
    pub fn new(enabled: Option<&[String]>) -> Self {
        let categories = CATEGORY_TABLE
            .iter()
            .map(|&(key, endpoint, scope, title, sub_types)| Category {
                key,
                endpoint,
                scope,
                title,
                sub_types,
                enabled: key == "user"
                    || enabled.map_or(true, |list| list.iter().any(|k| k == key)),
            })
            .collect();

        Self { categories }
    }

    /// All categories, optionally only the enabled ones.
    pub fn all(&self, enabled_only: bool) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| !enabled_only || c.enabled)
            .collect()
    }

    /// One category by type key.
    pub fn get(&self, key: &str, enabled_only: bool) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.key == key && (!enabled_only || c.enabled))
    }

    /// Look up the whole catalog, one category, or one sub-type label.
    ///
    /// Unknown (or, with `enabled_only`, disabled) types and unknown
    /// sub-types yield `None`. A sub-type without a type is ignored.
    pub fn lookup(
        &self,
        key: Option<&str>,
        sub_type: Option<u32>,
        enabled_only: bool,
    ) -> Option<CatalogEntry<'_>> {
        let Some(key) = key else {
            return Some(CatalogEntry::All(self.all(enabled_only)));
        };

        let category = self.get(key, enabled_only)?;
        match sub_type {
            Some(sub_type) => category.sub_type_label(sub_type).map(CatalogEntry::SubType),
            None => Some(CatalogEntry::Category(category)),
        }
    }

    /// OAuth scopes needed for the enabled categories, in table order.
    pub fn scopes(&self) -> Vec<&'static str> {
        self.categories
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.scope)
            .collect()
    }

    /// Enabled categories that produce summaries.
    pub fn syncable(&self) -> impl Iterator<Item = &Category> {
        self.categories
            .iter()
            .filter(|c| c.enabled && c.has_summaries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_sub_type_label() {
        let catalog = CategoryCatalog::default();
        assert_eq!(
            catalog.lookup(Some("sleep"), Some(1), false),
            Some(CatalogEntry::SubType("Power nap"))
        );
    }

    #[test]
    fn test_unknown_type_is_absent() {
        let catalog = CategoryCatalog::default();
        assert_eq!(catalog.lookup(Some("unknown"), None, false), None);
        assert_eq!(catalog.lookup(Some("unknown"), Some(1), false), None);
    }

    #[test]
    fn test_unknown_sub_type_is_absent() {
        let catalog = CategoryCatalog::default();
        assert_eq!(catalog.lookup(Some("sleep"), Some(9), false), None);
        assert_eq!(catalog.lookup(Some("move"), Some(0), false), None);
    }

    #[test]
    fn test_mood_has_eight_levels() {
        let catalog = CategoryCatalog::default();
        let mood = catalog.get("mood", false).unwrap();
        assert_eq!(mood.sub_types.len(), 8);
        assert_eq!(mood.sub_type_label(8), Some("Totally done"));
    }

    #[test]
    fn test_whole_catalog() {
        let catalog = CategoryCatalog::default();
        match catalog.lookup(None, None, false) {
            Some(CatalogEntry::All(list)) => {
                let keys: Vec<_> = list.iter().map(|c| c.key).collect();
                assert_eq!(keys, vec!["user", "goal", "mood", "move", "sleep"]);
            }
            other => panic!("unexpected lookup result: {:?}", other),
        }
    }

    #[test]
    fn test_enabled_only_filters() {
        let enabled = vec!["sleep".to_string()];
        let catalog = CategoryCatalog::new(Some(&enabled));

        assert!(catalog.get("move", true).is_none());
        assert!(catalog.get("move", false).is_some());
        assert_eq!(catalog.all(true).len(), 2); // user + sleep
        assert_eq!(catalog.scopes(), vec!["basic_read", "sleep_read"]);

        let syncable: Vec<_> = catalog.syncable().map(|c| c.key).collect();
        assert_eq!(syncable, vec!["sleep"]);
    }

    #[test]
    fn test_default_scopes_match_up_permissions() {
        let catalog = CategoryCatalog::default();
        assert_eq!(
            catalog.scopes().join(" "),
            "basic_read extended_read mood_read move_read sleep_read"
        );
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("sleeps"), "sleep");
        assert_eq!(normalize_type("sleep"), "sleep");
        assert_eq!(normalize_type("moves"), "moves");
    }
}
