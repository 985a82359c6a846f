//! Error handling tests for event collection.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

/// Invalid JSON is a malformed payload.
#[tokio::test]
async fn test_invalid_json_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert!(ctx.memory().is_empty("events"));
}

/// A JSON array is not an event.
#[tokio::test]
async fn test_non_object_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&serde_json::json!([{ "event_type": "click" }]))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>()["code"], "VALID_001");
}

/// Missing event_type is a malformed payload.
#[tokio::test]
async fn test_missing_event_type_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&serde_json::json!({ "page_url": "/home" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>()["code"], "VALID_001");
}

/// Unrecognized event types list the allowed set.
#[tokio::test]
async fn test_unknown_event_type_lists_allowed() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&fixtures::event("hover"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
    assert_eq!(
        body["details"],
        serde_json::json!(["page_view", "click", "scroll", "form_submit"])
    );
    assert!(ctx.memory().is_empty("sessions"));
}

/// Payloads above 64KB are rejected before parsing.
#[tokio::test]
async fn test_oversized_payload_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&fixtures::oversized_event())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert!(body["error"].as_str().unwrap().contains("exceeds"));
}

/// Over-long fields fail validation.
#[tokio::test]
async fn test_field_length_limits() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&serde_json::json!({
            "event_type": "page_view",
            "page_url": "x".repeat(3_000),
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>()["code"], "VALID_001");
}

/// A failed session write still acknowledges the stored event.
#[tokio::test]
async fn test_session_persist_failure_still_acknowledged() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.store.fail_writes("sessions", true);
    let response = server
        .post("/api/events/collect")
        .json(&fixtures::page_view("/home"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let session_id = body["session_id"].as_str().unwrap();
    assert!(session_id.starts_with("sess_"));
    assert_eq!(ctx.memory().len("events"), 1);
    assert!(ctx.memory().is_empty("sessions"));
}

/// A failed event write is a server error.
#[tokio::test]
async fn test_event_write_failure_is_unavailable() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.store.fail_writes("events", true);
    let response = server
        .post("/api/events/collect")
        .json(&fixtures::page_view("/home"))
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<serde_json::Value>()["code"], "STORE_001");
}
