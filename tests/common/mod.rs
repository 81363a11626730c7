// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use upsync::config::Config;
use upsync::db::Db;
use upsync::middleware::auth::create_jwt;
use upsync::models::{Band, Token};
use upsync::routes::create_router;
use upsync::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::new_firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app on an empty in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app whose UP client talks to `fake`.
#[allow(dead_code)]
pub fn create_test_app_with_up(fake: &FakeUp) -> (Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.up_api_host = fake.base_url.clone();
    create_test_app_with_config(config)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Db::new_in_memory()));
    (create_router(state.clone()), state)
}

/// Session JWT for `user_id`, signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64) -> String {
    create_jwt(user_id, &Config::test_default().jwt_signing_key).unwrap()
}

/// Store a token and band for `user_id` as if the OAuth flow had completed.
#[allow(dead_code)]
pub async fn seed_linked_user(state: &AppState, user_id: u64, expires: i64) -> (Token, Band) {
    let mut token = Token {
        id: 0,
        user_id,
        access_token: format!("seed-access-{}", user_id),
        refresh_token: format!("seed-refresh-{}", user_id),
        expires,
    };
    state.up_service.save_token(&mut token).await.unwrap();

    let mut band = Band {
        id: 0,
        xid: format!("band-xid-{}", user_id),
        user_id,
        first_name: "Test".to_string(),
        last_name: format!("User{}", user_id),
        image_url: String::new(),
    };
    state.up_service.save_band(&mut band).await.unwrap();

    (token, band)
}

#[allow(dead_code)]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─── Fake UP server ──────────────────────────────────────────

/// Behavior and call log of the fake UP server.
#[derive(Debug)]
pub struct FakeUpState {
    /// Status returned by the token endpoint
    pub token_status: u16,
    /// Body returned by the token endpoint on a non-2xx status
    pub token_error_body: String,
    /// Query parameters of every token request, in order
    pub token_calls: Vec<HashMap<String, String>>,
    /// Status returned by the data endpoints
    pub data_status: u16,
    /// `data` value per endpoint ("sleeps", "moves", ...)
    pub data: HashMap<String, Value>,
    /// `limit` and bearer token of every list request, keyed by endpoint
    pub list_calls: Vec<(String, Option<String>, Option<String>)>,
    pub profile: Value,
    pub revoke_calls: u32,
}

impl Default for FakeUpState {
    fn default() -> Self {
        Self {
            token_status: 200,
            token_error_body: json!({"error": "invalid_grant"}).to_string(),
            token_calls: Vec::new(),
            data_status: 200,
            data: HashMap::new(),
            list_calls: Vec::new(),
            profile: json!({
                "xid": "RGaCBFg9CsB83FsEcMY44A",
                "first": "Ada",
                "last": "Lovelace",
                "image": "/user/image/i/ada.png"
            }),
            revoke_calls: 0,
        }
    }
}

/// A local HTTP server speaking the subset of the UP API the client uses.
#[allow(dead_code)]
pub struct FakeUp {
    pub base_url: String,
    pub state: Arc<Mutex<FakeUpState>>,
}

#[allow(dead_code)]
impl FakeUp {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeUpState::default()));

        let app = Router::new()
            .route("/auth/oauth2/token", get(fake_token))
            .route("/nudge/api/v.1.1/users/@me", get(fake_profile))
            .route(
                "/nudge/api/v.1.1/users/@me/PartnerAppMembership",
                delete(fake_revoke),
            )
            .route("/nudge/api/v.1.1/users/@me/{endpoint}", get(fake_list))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_items(&self, endpoint: &str, items: Value) {
        self.state
            .lock()
            .unwrap()
            .data
            .insert(endpoint.to_string(), json!({ "items": items, "size": 0 }));
    }

    pub fn set_data(&self, endpoint: &str, data: Value) {
        self.state
            .lock()
            .unwrap()
            .data
            .insert(endpoint.to_string(), data);
    }

    pub fn set_token_status(&self, status: u16, body: Value) {
        let mut state = self.state.lock().unwrap();
        state.token_status = status;
        state.token_error_body = body.to_string();
    }

    pub fn set_data_status(&self, status: u16) {
        self.state.lock().unwrap().data_status = status;
    }

    pub fn token_calls(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().token_calls.clone()
    }

    pub fn list_calls(&self) -> Vec<(String, Option<String>, Option<String>)> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn revoke_calls(&self) -> u32 {
        self.state.lock().unwrap().revoke_calls
    }
}

type Shared = Arc<Mutex<FakeUpState>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Issues `access-N` / `refresh-N` where N counts token requests.
async fn fake_token(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.token_calls.push(params);
    let n = state.token_calls.len();

    if state.token_status != 200 {
        let status = StatusCode::from_u16(state.token_status).unwrap();
        return (status, state.token_error_body.clone()).into_response();
    }

    Json(json!({
        "access_token": format!("access-{}", n),
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{}", n)
    }))
    .into_response()
}

async fn fake_profile(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.data_status != 200 {
        return data_error(state.data_status);
    }
    Json(json!({ "meta": { "code": 200 }, "data": state.profile })).into_response()
}

async fn fake_list(
    State(state): State<Shared>,
    Path(endpoint): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state
        .list_calls
        .push((endpoint.clone(), params.get("limit").cloned(), bearer(&headers)));

    if state.data_status != 200 {
        return data_error(state.data_status);
    }

    let data = state
        .data
        .get(&endpoint)
        .cloned()
        .unwrap_or_else(|| json!({ "items": [], "size": 0 }));
    Json(json!({ "meta": { "code": 200 }, "data": data })).into_response()
}

async fn fake_revoke(State(state): State<Shared>) -> Response {
    let mut state = state.lock().unwrap();
    state.revoke_calls += 1;
    Json(json!({ "meta": { "code": 200 }, "data": {} })).into_response()
}

fn data_error(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    (
        status,
        Json(json!({ "meta": { "code": status.as_u16(), "error_detail": "Fake UP failure" } })),
    )
        .into_response()
}
