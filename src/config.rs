// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Default UP API host. Overridable so tests can point at a local fake.
pub const DEFAULT_UP_API_HOST: &str = "https://jawbone.com";

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for DbBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(DbBackend::Firestore),
            "memory" => Ok(DbBackend::Memory),
            _ => Err(ConfigError::Invalid("DB_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// UP OAuth client ID (public)
    pub up_client_id: String,
    /// UP host serving both OAuth and data endpoints
    pub up_api_host: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Public URL of this API (used for the OAuth redirect_uri)
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Storage backend
    pub db_backend: DbBackend,
    /// Enabled summary categories; `None` enables all of them
    pub enabled_categories: Option<Vec<String>>,
    /// Items requested per category on each sync
    pub sync_page_limit: u32,

    // --- Secrets ---
    /// UP OAuth client secret
    pub up_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let db_backend = env::var("DB_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        let sync_page_limit = match env::var("SYNC_PAGE_LIMIT") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("SYNC_PAGE_LIMIT", v))?,
            Err(_) => 10,
        };

        Ok(Self {
            up_client_id: env::var("UP_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("UP_CLIENT_ID"))?,
            up_api_host: env::var("UP_API_HOST")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_UP_API_HOST.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| format!("http://localhost:{}", port)),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port,
            db_backend,
            enabled_categories: env::var("UP_CATEGORIES")
                .ok()
                .map(|v| parse_category_list(&v)),
            sync_page_limit,

            up_client_secret: env::var("UP_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("UP_CLIENT_SECRET"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            up_client_id: "test_client_id".to_string(),
            up_api_host: "http://127.0.0.1:9".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            db_backend: DbBackend::Memory,
            enabled_categories: None,
            sync_page_limit: 10,
            up_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// OAuth redirect URI registered with UP.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/up/callback", self.api_url.trim_end_matches('/'))
    }
}

fn parse_category_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
