// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! upsync: link local users to Jawbone UP and mirror their activity summaries
//!
//! This crate provides the backend API that runs the UP OAuth2 flow, keeps
//! one token pair per user fresh, and syncs moves, sleep, mood and goals
//! into local storage.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use models::CategoryCatalog;
use services::{SyncService, UpClient, UpService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub catalog: Arc<CategoryCatalog>,
    pub up_service: UpService,
    pub sync_service: SyncService,
}

impl AppState {
    /// Wire the services together on top of an open database.
    pub fn new(config: Config, db: Db) -> Self {
        let catalog = Arc::new(CategoryCatalog::new(config.enabled_categories.as_deref()));

        let client = UpClient::new(
            &config.up_api_host,
            config.up_client_id.clone(),
            config.up_client_secret.clone(),
        );
        let up_service = UpService::new(client, db.clone());
        let sync_service = SyncService::new(up_service.clone(), db.clone(), catalog.clone());

        Self {
            config,
            db,
            catalog,
            up_service,
            sync_service,
        }
    }
}
