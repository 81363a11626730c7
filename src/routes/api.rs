// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{normalize_type, Band, CatalogEntry, Category, Summary};
use crate::services::sync::{CategorySyncResult, DisconnectResult};
use crate::time_utils::unix_to_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes that need no session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/categories", get(get_categories))
}

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/band", get(get_band).delete(disconnect))
        .route("/api/summaries", get(get_summaries))
        .route("/api/sync", post(sync))
}

// ─── Band ────────────────────────────────────────────────────

/// Linked band response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BandResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub xid: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
}

impl From<Band> for BandResponse {
    fn from(band: Band) -> Self {
        Self {
            id: band.id,
            xid: band.xid,
            first_name: band.first_name,
            last_name: band.last_name,
            image_url: band.image_url,
        }
    }
}

async fn get_band(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BandResponse>> {
    let band = state
        .up_service
        .load_band_by_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No UP band linked for user {}", user.user_id)))?;

    Ok(Json(band.into()))
}

/// Unlink UP: revoke the grant, then delete summaries, band and token.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DisconnectResult>> {
    tracing::info!(user_id = user.user_id, "User-initiated UP disconnect");
    let result = state.sync_service.disconnect(user.user_id).await?;
    Ok(Json(result))
}

// ─── Summaries ───────────────────────────────────────────────

#[derive(Deserialize)]
struct SummariesQuery {
    /// Filter by category type ("sleep", "move", ...)
    #[serde(rename = "type")]
    summary_type: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummariesResponse {
    pub summaries: Vec<SummaryView>,
    pub total: u32,
}

/// One stored summary, timestamps rendered as RFC3339.
#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummaryView {
    pub xid: String,
    #[serde(rename = "type")]
    pub summary_type: String,
    pub sub_type: u32,
    /// Catalog label for the sub-type, if it has one
    pub sub_type_label: Option<String>,
    pub title: String,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub completed: Option<String>,
    pub snapshot_image: String,
    pub image: String,
}

impl SummaryView {
    fn new(summary: Summary, category: Option<&Category>) -> Self {
        Self {
            sub_type_label: category
                .and_then(|c| c.sub_type_label(summary.sub_type))
                .map(str::to_string),
            created: unix_to_rfc3339(summary.created),
            updated: unix_to_rfc3339(summary.updated),
            completed: unix_to_rfc3339(summary.completed),
            xid: summary.xid,
            summary_type: summary.summary_type,
            sub_type: summary.sub_type,
            title: summary.title,
            snapshot_image: summary.snapshot_image,
            image: summary.image,
        }
    }
}

async fn get_summaries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SummariesQuery>,
) -> Result<Json<SummariesResponse>> {
    let summary_type = params
        .summary_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(normalize_type);

    tracing::debug!(user_id = user.user_id, summary_type = ?summary_type, "Fetching summaries");

    let Some(band) = state.up_service.load_band_by_user(user.user_id).await? else {
        return Ok(Json(SummariesResponse {
            summaries: Vec::new(),
            total: 0,
        }));
    };

    let summaries: Vec<SummaryView> = state
        .sync_service
        .list_summaries(band.id, summary_type)
        .await?
        .into_iter()
        .map(|s| {
            let category = state.catalog.get(&s.summary_type, false);
            SummaryView::new(s, category)
        })
        .collect();

    Ok(Json(SummariesResponse {
        total: summaries.len() as u32,
        summaries,
    }))
}

// ─── Sync ────────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncResponse {
    pub categories: Vec<CategorySyncResult>,
    pub inserted: u32,
    pub updated: u32,
}

/// Fetch one page of every enabled category and store it.
async fn sync(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SyncResponse>> {
    let categories = state
        .sync_service
        .sync_enabled(user.user_id, state.config.sync_page_limit)
        .await?;

    Ok(Json(SyncResponse {
        inserted: categories.iter().map(|c| c.inserted).sum(),
        updated: categories.iter().map(|c| c.updated).sum(),
        categories,
    }))
}

// ─── Categories ──────────────────────────────────────────────

#[derive(Deserialize)]
struct CategoriesQuery {
    #[serde(rename = "type")]
    category_type: Option<String>,
    sub_type: Option<u32>,
    #[serde(default)]
    enabled_only: bool,
}

/// Catalog lookup result, shaped by how specific the query was.
#[derive(Serialize)]
#[serde(untagged)]
pub enum CategoriesResponse<'a> {
    All { categories: Vec<&'a Category> },
    Category(&'a Category),
    SubType { label: &'static str },
}

async fn get_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoriesQuery>,
) -> Result<Response> {
    let key = params.category_type.as_deref().map(normalize_type);
    let entry = state
        .catalog
        .lookup(key, params.sub_type, params.enabled_only)
        .ok_or_else(|| {
            AppError::NotFound(match (key, params.sub_type) {
                (Some(k), Some(s)) => format!("Sub-type {} of category '{}'", s, k),
                (Some(k), None) => format!("Category '{}'", k),
                _ => "Category".to_string(),
            })
        })?;

    let body = match entry {
        CatalogEntry::All(categories) => CategoriesResponse::All { categories },
        CatalogEntry::Category(category) => CategoriesResponse::Category(category),
        CatalogEntry::SubType(label) => CategoriesResponse::SubType { label },
    };

    // Serialized here since the body borrows from the shared catalog.
    Ok(Json(body).into_response())
}
