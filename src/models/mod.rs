// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod band;
pub mod category;
pub mod summary;
pub mod token;

pub use band::Band;
pub use category::{normalize_type, CatalogEntry, Category, CategoryCatalog, SubType};
pub use summary::{BandRef, RawSummaryItem, Summary, SummaryRef};
pub use token::Token;
