// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Summary upsert, bulk delete, category sync and disconnect.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use upsync::error::AppError;
use upsync::models::{Band, Summary};
use upsync::services::UpsertOutcome;

mod common;
use common::{create_test_app, create_test_app_with_up, create_test_jwt, seed_linked_user, FakeUp};

const SLEEPS_PAGE: &str = include_str!("fixtures/up_sleeps_page.json");

fn sleep_items() -> Value {
    let page: Value = serde_json::from_str(SLEEPS_PAGE).unwrap();
    page["data"]["items"].clone()
}

fn summary(xid: &str, band_id: u64, title: &str, created: i64) -> Summary {
    Summary {
        xid: xid.to_string(),
        band_id,
        updated: created + 10,
        created,
        completed: created + 5,
        summary_type: "move".to_string(),
        sub_type: 0,
        title: title.to_string(),
        snapshot_image: String::new(),
        image: String::new(),
    }
}

// ─── Upsert / delete ─────────────────────────────────────────

#[tokio::test]
async fn test_upsert_same_xid_keeps_one_row_with_latest_values() {
    let (_, state) = create_test_app();
    let sync = &state.sync_service;

    let first = summary("X1", 1, "first", 100);
    let second = summary("X1", 1, "second", 200);

    assert_eq!(sync.upsert_summary(&first).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(sync.upsert_summary(&second).await.unwrap(), UpsertOutcome::Updated);

    let rows = sync.list_summaries(1, None).await.unwrap();
    assert_eq!(rows, vec![second.clone()]);
    assert_eq!(sync.load_summary("X1").await.unwrap(), Some(second));
}

#[tokio::test]
async fn test_xid_with_path_characters() {
    let (_, state) = create_test_app();
    let s = summary("a/b c", 1, "odd", 1);

    state.sync_service.upsert_summary(&s).await.unwrap();

    assert_eq!(state.sync_service.load_summary("a/b c").await.unwrap(), Some(s));
}

#[tokio::test]
async fn test_list_summaries_newest_first_and_filtered() {
    let (_, state) = create_test_app();
    let sync = &state.sync_service;

    let mut sleep = summary("S1", 1, "sleep", 300);
    sleep.summary_type = "sleep".to_string();
    sync.upsert_summary(&summary("M1", 1, "old", 100)).await.unwrap();
    sync.upsert_summary(&summary("M2", 1, "new", 200)).await.unwrap();
    sync.upsert_summary(&sleep).await.unwrap();

    let all: Vec<String> = sync
        .list_summaries(1, None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.xid)
        .collect();
    assert_eq!(all, vec!["S1", "M2", "M1"]);

    let moves = sync.list_summaries(1, Some("move")).await.unwrap();
    assert_eq!(moves.len(), 2);
}

#[tokio::test]
async fn test_delete_summaries_by_band_only_touches_that_band() {
    let (_, state) = create_test_app();
    let sync = &state.sync_service;

    let band = Band {
        id: 1,
        xid: "B1".to_string(),
        user_id: 1,
        first_name: String::new(),
        last_name: String::new(),
        image_url: String::new(),
    };

    for (xid, band_id) in [("A1", 1), ("A2", 1), ("B1", 2)] {
        sync.upsert_summary(&summary(xid, band_id, "", 1)).await.unwrap();
    }

    assert_eq!(sync.delete_summaries_by_band(&band).await.unwrap(), 2);

    assert!(sync.list_summaries(1, None).await.unwrap().is_empty());
    assert_eq!(sync.list_summaries(2, None).await.unwrap().len(), 1);

    // By ID as well
    assert_eq!(sync.delete_summaries_by_band(2u64).await.unwrap(), 1);
    assert!(sync.list_summaries(2, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_summary_by_xid_or_value() {
    let (_, state) = create_test_app();
    let sync = &state.sync_service;

    let a = summary("A", 1, "", 1);
    let b = summary("B", 1, "", 2);
    sync.upsert_summary(&a).await.unwrap();
    sync.upsert_summary(&b).await.unwrap();

    sync.delete_summary("A").await.unwrap();
    sync.delete_summary(&b).await.unwrap();

    assert!(sync.list_summaries(1, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_summaries_by_user_without_band() {
    let (_, state) = create_test_app();
    state
        .sync_service
        .upsert_summary(&summary("A", 1, "", 1))
        .await
        .unwrap();

    assert_eq!(state.sync_service.delete_summaries_by_user(123).await.unwrap(), 0);
    assert_eq!(state.sync_service.list_summaries(1, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_summaries_by_user_only_touches_their_band() {
    let (_, state) = create_test_app();
    let sync = &state.sync_service;
    let (_, band) = seed_linked_user(&state, 4, common::now() + 3600).await;
    let (_, other_band) = seed_linked_user(&state, 5, common::now() + 3600).await;

    for (xid, band_id) in [("U1", band.id), ("U2", band.id), ("O1", other_band.id)] {
        sync.upsert_summary(&summary(xid, band_id, "", 1)).await.unwrap();
    }

    assert_eq!(sync.delete_summaries_by_user(4).await.unwrap(), 2);

    assert!(sync.list_summaries(band.id, None).await.unwrap().is_empty());
    let remaining = sync.list_summaries(other_band.id, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].xid, "O1");
    // The band itself is kept
    assert!(state.up_service.load_band(band.id).await.unwrap().is_some());
}

// ─── Sync against the fake vendor ────────────────────────────

#[tokio::test]
async fn test_sync_repeated_xid_in_page_keeps_last_values() {
    let fake = FakeUp::start().await;
    fake.set_items(
        "sleeps",
        json!([
            {"xid": "DUP", "title": "first", "time_created": 1},
            {"xid": "DUP", "title": "second", "time_created": 2}
        ]),
    );
    let (_, state) = create_test_app_with_up(&fake);
    let (_, band) = seed_linked_user(&state, 4, common::now() + 3600).await;
    let sleep = state.catalog.get("sleep", true).unwrap();

    let result = state.sync_service.sync_category(4, sleep, 10).await.unwrap();

    assert_eq!((result.fetched, result.inserted, result.updated), (2, 1, 1));
    let stored = state.sync_service.list_summaries(band.id, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "second");
    assert_eq!(stored[0].created, 2);
}

#[tokio::test]
async fn test_sync_category_inserts_then_updates() {
    let fake = FakeUp::start().await;
    fake.set_items("sleeps", sleep_items());
    let (_, state) = create_test_app_with_up(&fake);
    let (_, band) = seed_linked_user(&state, 4, common::now() + 3600).await;
    let sleep = state.catalog.get("sleep", true).unwrap();

    let first = state.sync_service.sync_category(4, sleep, 10).await.unwrap();
    assert_eq!((first.fetched, first.inserted, first.updated), (3, 3, 0));

    let second = state.sync_service.sync_category(4, sleep, 10).await.unwrap();
    assert_eq!((second.fetched, second.inserted, second.updated), (3, 0, 3));

    let stored = state.sync_service.list_summaries(band.id, None).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|s| s.summary_type == "sleep"));

    let nap = state
        .sync_service
        .load_summary("7zYpQmBzOI0Q0vyYxvqf2A")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(nap.sub_type, 1);
    assert_eq!(nap.band_id, band.id);

    let calls = fake.list_calls();
    assert_eq!(calls[0].0, "sleeps");
    assert_eq!(calls[0].1.as_deref(), Some("10"));
    assert_eq!(calls[0].2.as_deref(), Some("seed-access-4"));
}

#[tokio::test]
async fn test_sync_accepts_single_item_and_empty_data() {
    let fake = FakeUp::start().await;
    fake.set_data(
        "mood",
        json!({"xid": "MOOD1", "title": "Feeling good", "sub_type": 4, "time_created": 5}),
    );
    fake.set_data("goals", json!({}));
    let (_, state) = create_test_app_with_up(&fake);
    seed_linked_user(&state, 4, common::now() + 3600).await;

    let mood = state.catalog.get("mood", true).unwrap();
    let result = state.sync_service.sync_category(4, mood, 10).await.unwrap();
    assert_eq!(result.inserted, 1);

    let goal = state.catalog.get("goal", true).unwrap();
    let result = state.sync_service.sync_category(4, goal, 10).await.unwrap();
    assert_eq!(result.fetched, 0);

    let stored = state.sync_service.load_summary("MOOD1").await.unwrap().unwrap();
    assert_eq!(stored.summary_type, "mood");
    assert_eq!(stored.sub_type, 4);
}

#[tokio::test]
async fn test_sync_refreshes_expired_token_first() {
    let fake = FakeUp::start().await;
    let (_, state) = create_test_app_with_up(&fake);
    seed_linked_user(&state, 4, 0).await;

    let moves = state.catalog.get("move", true).unwrap();
    state.sync_service.sync_category(4, moves, 10).await.unwrap();

    assert_eq!(fake.token_calls().len(), 1);
    assert_eq!(fake.list_calls()[0].2.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_sync_data_error_is_upstream_data() {
    let fake = FakeUp::start().await;
    fake.set_data_status(500);
    let (_, state) = create_test_app_with_up(&fake);
    seed_linked_user(&state, 4, common::now() + 3600).await;

    let moves = state.catalog.get("move", true).unwrap();
    let err = state.sync_service.sync_category(4, moves, 10).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamData(ref m) if m.contains("Fake UP failure")));
}

#[tokio::test]
async fn test_sync_user_category_is_rejected() {
    let (_, state) = create_test_app();
    let user = state.catalog.get("user", false).unwrap();

    let err = state.sync_service.sync_category(4, user, 10).await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_sync_without_band_is_not_found() {
    let fake = FakeUp::start().await;
    let (_, state) = create_test_app_with_up(&fake);

    let err = state.sync_service.sync_enabled(4, 10).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(fake.list_calls().is_empty());
}

#[tokio::test]
async fn test_sync_enabled_covers_enabled_summary_categories() {
    let fake = FakeUp::start().await;
    let mut config = upsync::config::Config::test_default();
    config.up_api_host = fake.base_url.clone();
    config.enabled_categories = Some(vec!["sleep".to_string(), "move".to_string()]);
    let (_, state) = common::create_test_app_with_config(config);
    seed_linked_user(&state, 4, common::now() + 3600).await;

    let results = state.sync_service.sync_enabled(4, 5).await.unwrap();

    let categories: Vec<&str> = results.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(categories, vec!["move", "sleep"]);
    let endpoints: Vec<String> = fake.list_calls().into_iter().map(|c| c.0).collect();
    assert_eq!(endpoints, vec!["moves", "sleeps"]);
}

#[tokio::test]
async fn test_disconnect_removes_everything_for_user() {
    let fake = FakeUp::start().await;
    fake.set_items("sleeps", sleep_items());
    let (_, state) = create_test_app_with_up(&fake);
    let (_, band) = seed_linked_user(&state, 4, common::now() + 3600).await;
    let (_, other_band) = seed_linked_user(&state, 5, common::now() + 3600).await;
    state
        .sync_service
        .upsert_summary(&summary("OTHER", other_band.id, "", 1))
        .await
        .unwrap();

    let sleep = state.catalog.get("sleep", true).unwrap();
    state.sync_service.sync_category(4, sleep, 10).await.unwrap();

    let result = state.sync_service.disconnect(4).await.unwrap();

    assert!(result.token_deleted);
    assert!(result.band_deleted);
    assert_eq!(result.summaries_deleted, 3);
    assert_eq!(fake.revoke_calls(), 1);
    assert!(state.up_service.load_token_by_user(4).await.unwrap().is_none());
    assert!(state.up_service.load_band(band.id).await.unwrap().is_none());

    // Other user untouched
    assert!(state.up_service.load_token_by_user(5).await.unwrap().is_some());
    assert_eq!(
        state.sync_service.list_summaries(other_band.id, None).await.unwrap().len(),
        1
    );
}

// ─── HTTP ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_and_list_over_http() {
    let fake = FakeUp::start().await;
    fake.set_items("sleeps", sleep_items());
    let (app, state) = create_test_app_with_up(&fake);
    seed_linked_user(&state, 4, common::now() + 3600).await;
    let token = create_test_jwt(4);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sync")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["inserted"], 3);
    assert_eq!(body["updated"], 0);
    assert_eq!(body["categories"].as_array().unwrap().len(), 4);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/summaries?type=sleeps")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["total"], 3);

    let first = &body["summaries"][0];
    assert_eq!(first["xid"], "40F7_htRRnT8Vo7nRBZO1X");
    assert_eq!(first["type"], "sleep");
    assert_eq!(first["sub_type_label"], "Normal");
    assert_eq!(first["created"], "2013-11-07T09:46:20Z");
    assert_eq!(body["summaries"][1]["sub_type_label"], "Power nap");
}

#[tokio::test]
async fn test_summaries_without_band_is_empty() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/summaries")
                .header(header::AUTHORIZATION, format!("Bearer {}", create_test_jwt(4)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_sync_token_rejected_is_bad_gateway() {
    let fake = FakeUp::start().await;
    fake.set_token_status(401, json!({"error": "invalid_grant"}));
    let (app, state) = create_test_app_with_up(&fake);
    seed_linked_user(&state, 4, 0).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sync")
                .header(header::AUTHORIZATION, format!("Bearer {}", create_test_jwt(4)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "upstream_auth_error");
    assert_eq!(body["details"], "invalid_grant");
}

#[tokio::test]
async fn test_disconnect_over_http() {
    let fake = FakeUp::start().await;
    let (app, state) = create_test_app_with_up(&fake);
    seed_linked_user(&state, 4, common::now() + 3600).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/band")
                .header(header::AUTHORIZATION, format!("Bearer {}", create_test_jwt(4)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["token_deleted"], true);
    assert_eq!(body["band_deleted"], true);
    assert!(state.up_service.load_band_by_user(4).await.unwrap().is_none());
}
