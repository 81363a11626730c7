// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! upsync API Server
//!
//! Links local users to their Jawbone UP accounts and syncs activity
//! summaries on request.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use upsync::{config::Config, db::Db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.db_backend,
        up_api_host = %config.up_api_host,
        "Starting upsync API"
    );

    let db = Db::connect(&config).await?;

    let state = Arc::new(AppState::new(config.clone(), db));
    tracing::info!(
        categories = ?state.catalog.syncable().map(|c| c.key).collect::<Vec<_>>(),
        "Category catalog loaded"
    );

    // Build router
    let app = upsync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("upsync=debug,info")))
        .with(format)
        .init();
}
