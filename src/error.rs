// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Non-2xx (or unparseable) response from the UP OAuth endpoints.
    #[error("UP authentication error: {0}")]
    UpstreamAuth(String),

    /// Non-2xx or malformed response from the UP data endpoints.
    #[error("UP API error: {0}")]
    UpstreamData(String),

    /// Insert hit an existing key. Recovered by the upsert paths.
    #[error("Duplicate key: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the vendor rejected our credentials (expired or revoked grant).
    pub fn is_upstream_auth_error(&self) -> bool {
        matches!(self, AppError::UpstreamAuth(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::UpstreamAuth(msg) => (
                StatusCode::BAD_GATEWAY,
                "upstream_auth_error",
                Some(msg.clone()),
            ),
            AppError::UpstreamData(msg) => (
                StatusCode::BAD_GATEWAY,
                "upstream_data_error",
                Some(msg.clone()),
            ),
            AppError::Conflict(msg) => {
                tracing::warn!(error = %msg, "Unrecovered duplicate key");
                (StatusCode::CONFLICT, "conflict", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
