// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! UP OAuth routes.
//!
//! The start route needs a logged-in local user; it signs that user's ID into
//! the OAuth `state` so the public callback knows whom the grant belongs to.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Extension, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::up::build_authorize_url;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed `state` stays valid.
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

/// Public routes (the vendor redirects the browser here).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/up/callback", get(auth_callback))
}

/// Routes that require a session; auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/up", get(auth_start))
}

/// Start OAuth flow - redirect to the UP authorization page.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Redirect> {
    let now = chrono::Utc::now().timestamp();
    let oauth_state = sign_state(user.user_id, now, &state.config.oauth_state_key)?;

    let client = state.up_service.client();
    let auth_url = build_authorize_url(
        &client.auth_uri(),
        client.client_id(),
        &state.config.redirect_uri(),
        &state.catalog.scopes(),
        Some(&oauth_state),
    );

    tracing::info!(user_id = user.user_id, "Starting OAuth flow, redirecting to UP");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, store token and band.
///
/// Always ends in a redirect to the frontend; failures carry `error`.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.trim_end_matches('/').to_string();
    let fail = |message: &str| {
        Redirect::temporary(&format!(
            "{}?error={}",
            frontend_url,
            urlencoding::encode(message)
        ))
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from UP");
        return fail(&error);
    }

    let now = chrono::Utc::now().timestamp();
    let Some(user_id) = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now))
    else {
        tracing::warn!("Invalid, expired or tampered OAuth state");
        return fail("invalid_state");
    };

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return fail("missing_code");
    };

    tracing::info!(user_id, "Exchanging authorization code for tokens");

    match state.up_service.handle_oauth_callback(&code, user_id).await {
        Ok(band) => {
            tracing::info!(user_id, band_id = band.id, "UP account linked");
            Redirect::temporary(&format!("{}?linked=up", frontend_url))
        }
        Err(e) => {
            tracing::error!(error = %e, user_id, "Failed to link UP account");
            fail(redirect_error_code(&e))
        }
    }
}

/// Encode `user_id|issued_at_hex|signature_hex` as URL-safe base64.
pub(crate) fn sign_state(user_id: u64, issued_at: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", user_id, issued_at);
    let signature = state_signature(&payload, secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a signed state and return its user ID if valid and fresh.
pub(crate) fn verify_state(state: &str, secret: &[u8], now: i64) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let mut parts = state_str.splitn(3, '|');
    let (user_part, issued_part, signature) = (parts.next()?, parts.next()?, parts.next()?);

    let payload = format!("{}|{}", user_part, issued_part);
    let expected = state_signature(&payload, secret).ok()?;
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        tracing::error!("OAuth state signature mismatch");
        return None;
    }

    let issued_at = i64::from_str_radix(issued_part, 16).ok()?;
    if now - issued_at > STATE_MAX_AGE_SECS || issued_at > now {
        return None;
    }

    user_part.parse().ok()
}

/// Error code for the frontend redirect. Only a short vendor OAuth code such
/// as `invalid_grant` is passed through; anything else is `link_failed`.
fn redirect_error_code(error: &AppError) -> &str {
    match error {
        AppError::UpstreamAuth(code)
            if !code.is_empty()
                && code.len() <= 64
                && code.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') =>
        {
            code
        }
        _ => "link_failed",
    }
}

fn state_signature(payload: &str, secret: &[u8]) -> std::result::Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
