// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Jawbone UP API client and OAuth token lifecycle.
//!
//! Handles:
//! - Authorize/token/refresh URL construction
//! - Response decoding (non-2xx is always an error)
//! - Code exchange, token refresh and revocation
//! - Token and band persistence (one of each per local user)

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{Band, RawSummaryItem, Token};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// OAuth authorization endpoint, relative to the UP host.
pub const AUTH_PATH: &str = "/auth/oauth2/auth";
/// OAuth token endpoint, relative to the UP host.
pub const TOKEN_PATH: &str = "/auth/oauth2/token";
/// Prefix of all data endpoints for the authenticated user.
const USER_API_PATH: &str = "/nudge/api/v.1.1/users/@me";

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Longest slice of a raw error body we put into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

// ─────────────────────────────────────────────────────────────────────────────
// URL builders
// ─────────────────────────────────────────────────────────────────────────────

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", base, query)
}

/// URL the user's browser is sent to in order to grant access.
pub fn build_authorize_url(
    auth_uri: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[&str],
    state: Option<&str>,
) -> String {
    let scope = scopes.join(" ");
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", client_id),
        ("scope", scope.as_str()),
        ("redirect_uri", redirect_uri),
    ];
    if let Some(state) = state {
        params.push(("state", state));
    }
    with_query(auth_uri, &params)
}

/// Server-to-server URL trading an authorization code for tokens.
pub fn build_token_exchange_url(
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> String {
    with_query(
        token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
        ],
    )
}

/// Server-to-server URL trading a refresh token for a new token pair.
pub fn build_token_refresh_url(
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> String {
    with_query(
        token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ],
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Response decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Pull a human-readable message out of a failed response body.
///
/// Tries `error_field`, then `error_description`, then UP's
/// `meta.error_detail`, then the raw body, then the bare status.
pub fn upstream_error_message(status: u16, body: &str, error_field: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            json.get(error_field),
            json.get("error_description"),
            json.get("meta").and_then(|m| m.get("error_detail")),
        ];
        if let Some(msg) = candidates
            .into_iter()
            .flatten()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
        {
            return msg.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

/// Decode an OAuth endpoint response.
///
/// Statuses outside `[200, 300)` fail with `AppError::UpstreamAuth` carrying
/// the vendor's message. A 2xx body that does not match `T` fails the same way.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &str, error_field: &str) -> Result<T> {
    if !(200..300).contains(&status) {
        let message = upstream_error_message(status, body, error_field);
        tracing::error!(status, error = %message, "UP authentication error");
        return Err(AppError::UpstreamAuth(message));
    }

    serde_json::from_str(body).map_err(|e| {
        tracing::error!(status, error = %e, "Unparseable UP token response");
        AppError::UpstreamAuth(format!("Failed to parse token response: {}", e))
    })
}

/// Successful token exchange or refresh payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
}

/// Build an unsaved token from a token payload, expiring `expires_in` from now.
///
/// A negative or out-of-range `expires_in` is an `UpstreamAuth` error.
pub fn create_token(payload: &TokenResponse, user_id: u64) -> Result<Token> {
    create_token_at(payload, user_id, chrono::Utc::now().timestamp())
}

fn create_token_at(payload: &TokenResponse, user_id: u64, now: i64) -> Result<Token> {
    let expires = Some(payload.expires_in)
        .filter(|secs| *secs >= 0)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| {
            tracing::error!(expires_in = payload.expires_in, "Invalid token lifetime from UP");
            AppError::UpstreamAuth(format!("Invalid expires_in: {}", payload.expires_in))
        })?;

    Ok(Token {
        id: 0,
        user_id,
        access_token: payload.access_token.clone(),
        refresh_token: payload.refresh_token.clone(),
        expires,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// UpClient - raw API calls
// ─────────────────────────────────────────────────────────────────────────────

/// Envelope around every UP data response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Profile of the authenticated UP user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpProfile {
    pub xid: String,
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
    #[serde(default)]
    pub image: String,
}

/// `data` of a list endpoint. Some endpoints (mood, goals) return one object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsData {
    Page { items: Vec<RawSummaryItem> },
    Single(RawSummaryItem),
    #[allow(dead_code)]
    Empty(EmptyData),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyData {}

impl ItemsData {
    fn into_items(self) -> Vec<RawSummaryItem> {
        match self {
            ItemsData::Page { items } => items,
            ItemsData::Single(item) => vec![item],
            ItemsData::Empty(_) => Vec::new(),
        }
    }
}

/// UP API client.
#[derive(Clone)]
pub struct UpClient {
    http: reqwest::Client,
    api_host: String,
    client_id: String,
    client_secret: String,
}

impl UpClient {
    /// Create a new UP client with OAuth credentials.
    pub fn new(api_host: &str, client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_host: api_host.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn auth_uri(&self) -> String {
        format!("{}{}", self.api_host, AUTH_PATH)
    }

    pub fn token_uri(&self) -> String {
        format!("{}{}", self.api_host, TOKEN_PATH)
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let url =
            build_token_exchange_url(&self.token_uri(), &self.client_id, &self.client_secret, code);
        self.token_request(&url).await
    }

    /// Refresh an expired access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let url = build_token_refresh_url(
            &self.token_uri(),
            &self.client_id,
            &self.client_secret,
            refresh_token,
        );
        self.token_request(&url).await
    }

    async fn token_request(&self, url: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("Token request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("Failed to read token response: {}", e)))?;

        decode_response(status, &body, "error")
    }

    /// Get the authenticated user's profile.
    pub async fn get_profile(&self, access_token: &str) -> Result<UpProfile> {
        let envelope: Envelope<UpProfile> = self.get_json(access_token, "", &[]).await?;
        Ok(envelope.data)
    }

    /// Fetch the most recent page of items from a category endpoint.
    pub async fn list_items(
        &self,
        access_token: &str,
        endpoint: &str,
        limit: u32,
    ) -> Result<Vec<RawSummaryItem>> {
        let path = format!("/{}", endpoint);
        let envelope: Envelope<Option<ItemsData>> = self
            .get_json(access_token, &path, &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.data.map(ItemsData::into_items).unwrap_or_default())
    }

    /// Revoke this application's access for the user.
    ///
    /// Invalidates the access and refresh tokens on the UP side.
    pub async fn revoke(&self, access_token: &str) -> Result<()> {
        let url = format!("{}{}/PartnerAppMembership", self.api_host, USER_API_PATH);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::UpstreamData(format!("Revoke request failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::info!("UP access revoked");
        Ok(())
    }

    /// Generic GET request against a user data endpoint.
    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}{}", self.api_host, USER_API_PATH, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::UpstreamData(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = upstream_error_message(status, &body, "error");
        tracing::error!(status, error = %message, "UP API error");
        Err(AppError::UpstreamData(format!("HTTP {}: {}", status, message)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            let message = upstream_error_message(status, &body, "error");
            tracing::error!(status, error = %message, "UP API error");
            return Err(AppError::UpstreamData(format!("HTTP {}: {}", status, message)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Malformed UP API response");
            AppError::UpstreamData(format!("JSON parse error: {}", e))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UpService - token lifecycle and band linking
// ─────────────────────────────────────────────────────────────────────────────

/// High-level UP service that manages token lifecycle and the linked band.
#[derive(Clone)]
pub struct UpService {
    client: UpClient,
    db: Db,
}

impl UpService {
    pub fn new(client: UpClient, db: Db) -> Self {
        Self { client, db }
    }

    pub fn client(&self) -> &UpClient {
        &self.client
    }

    // ─── Token Persistence ───────────────────────────────────────────────────

    /// Insert the token if it has no ID yet, otherwise overwrite it in place.
    pub async fn save_token(&self, token: &mut Token) -> Result<u64> {
        if token.id == 0 {
            self.db.insert_token(token).await
        } else {
            self.db.set_token(token).await?;
            Ok(token.id)
        }
    }

    pub async fn load_token(&self, id: u64) -> Result<Option<Token>> {
        self.db.get_token(id).await
    }

    pub async fn load_token_by_user(&self, user_id: u64) -> Result<Option<Token>> {
        self.db.get_token_by_user(user_id).await
    }

    pub async fn delete_token(&self, id: u64) -> Result<()> {
        self.db.delete_token(id).await
    }

    // ─── Band Persistence ────────────────────────────────────────────────────

    /// Insert the band if it has no ID yet, otherwise overwrite it in place.
    pub async fn save_band(&self, band: &mut Band) -> Result<u64> {
        if band.id == 0 {
            self.db.insert_band(band).await
        } else {
            self.db.set_band(band).await?;
            Ok(band.id)
        }
    }

    pub async fn load_band(&self, id: u64) -> Result<Option<Band>> {
        self.db.get_band(id).await
    }

    pub async fn load_band_by_xid(&self, xid: &str) -> Result<Option<Band>> {
        self.db.get_band_by_xid(xid).await
    }

    pub async fn load_band_by_user(&self, user_id: u64) -> Result<Option<Band>> {
        self.db.get_band_by_user(user_id).await
    }

    pub async fn load_all_bands(&self) -> Result<Vec<Band>> {
        self.db.list_bands().await
    }

    pub async fn delete_band(&self, id: u64) -> Result<()> {
        self.db.delete_band(id).await
    }

    // ─── Token Lifecycle ─────────────────────────────────────────────────────

    /// Handle OAuth callback: exchange code for tokens, store the token and
    /// the user's band.
    pub async fn handle_oauth_callback(&self, code: &str, user_id: u64) -> Result<Band> {
        let payload = self.client.exchange_code(code).await?;
        let mut token = create_token(&payload, user_id)?;

        // Nothing is stored unless the profile fetch succeeds too
        let profile = self.client.get_profile(&token.access_token).await?;

        if let Some(existing) = self.load_token_by_user(user_id).await? {
            token.id = existing.id;
        }
        self.save_token(&mut token).await?;

        let mut band = self.link_band(user_id, profile).await?;
        self.save_band(&mut band).await?;

        tracing::info!(
            user_id,
            token_id = token.id,
            band_id = band.id,
            xid = %band.xid,
            "OAuth callback handled, token and band stored"
        );

        Ok(band)
    }

    /// Build the user's band from a profile, reusing the existing row if any.
    async fn link_band(&self, user_id: u64, profile: UpProfile) -> Result<Band> {
        let id = match self.load_band_by_user(user_id).await? {
            Some(existing) => {
                if existing.xid != profile.xid {
                    tracing::warn!(
                        user_id,
                        old_xid = %existing.xid,
                        new_xid = %profile.xid,
                        "User linked a different UP account"
                    );
                }
                existing.id
            }
            None => 0,
        };

        Ok(Band {
            id,
            xid: profile.xid,
            user_id,
            first_name: profile.first,
            last_name: profile.last,
            image_url: profile.image,
        })
    }

    /// Get a valid (non-expired) access token for the given user.
    ///
    /// Refreshes the stored token in place when it expires within the margin.
    pub async fn get_valid_access_token(&self, user_id: u64) -> Result<String> {
        let mut token = self
            .load_token_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Token for user {}", user_id)))?;

        let now = chrono::Utc::now().timestamp();
        if !token.expires_within(now, TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(token.access_token);
        }

        tracing::info!(user_id, token_id = token.id, "Access token expired, refreshing");

        let payload = self.client.refresh(&token.refresh_token).await?;
        let refreshed = create_token(&payload, user_id)?;
        token.access_token = refreshed.access_token;
        token.refresh_token = refreshed.refresh_token;
        token.expires = refreshed.expires;
        self.save_token(&mut token).await?;

        tracing::info!(user_id, token_id = token.id, "Token refreshed");
        Ok(token.access_token)
    }

    /// Revoke the user's grant with UP and delete the local token.
    ///
    /// Revocation is best effort: the local token is deleted even if UP
    /// rejects the call. Returns whether a token existed.
    pub async fn revoke(&self, user_id: u64) -> Result<bool> {
        let Some(token) = self.load_token_by_user(user_id).await? else {
            return Ok(false);
        };

        match self.get_valid_access_token(user_id).await {
            Ok(access_token) => {
                if let Err(e) = self.client.revoke(&access_token).await {
                    tracing::warn!(error = %e, user_id, "Failed to revoke UP access, continuing");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id, "No usable access token, skipping UP revoke");
            }
        }

        self.delete_token(token.id).await?;
        Ok(true)
    }
}
