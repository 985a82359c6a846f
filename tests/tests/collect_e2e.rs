//! End-to-end tests for event collection.
//!
//! POST /api/events/collect → EventCollector → SessionManager → store

use axum_test::TestServer;
use engine_core::{Event, Session};
use integration_tests::{fixtures, setup::TestContext, setup::T0};
use store::{key_item, Record, Store};

async fn stored_session(ctx: &TestContext, session_id: &str) -> Session {
    let item = ctx
        .memory()
        .get("sessions", &key_item("session_id", session_id))
        .await
        .expect("read session")
        .expect("session exists");
    Session::from_item(&item).expect("decodable session")
}

async fn stored_event(ctx: &TestContext, event_id: &str) -> Event {
    let item = ctx
        .memory()
        .get("events", &key_item("event_id", event_id))
        .await
        .expect("read event")
        .expect("event exists");
    Event::from_item(&item).expect("decodable event")
}

/// A page view without a session id creates one; a click continues it.
#[tokio::test]
async fn test_page_view_then_click_builds_session() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&fixtures::page_view("/home"))
        .await;
    response.assert_status_ok();
    let first: serde_json::Value = response.json();
    let session_id = first["session_id"].as_str().unwrap().to_string();
    assert!(session_id.starts_with("sess_"));
    assert!(first["event_id"].as_str().unwrap().starts_with("evt_20240305_"));

    ctx.advance_ms(4_000);
    let response = server
        .post("/api/events/collect")
        .json(&fixtures::in_session("click", &session_id, "/home"))
        .await;
    response.assert_status_ok();
    let second: serde_json::Value = response.json();
    assert_eq!(second["session_id"], session_id.as_str());

    let session = stored_session(&ctx, &session_id).await;
    assert_eq!(session.total_events, 2);
    assert_eq!(session.total_clicks, 1);
    assert_eq!(session.page_views, 1);
    assert_eq!(session.start_time, T0);
    assert_eq!(session.last_activity, T0 + 4_000);
    assert_eq!(session.session_duration, 4_000);
    assert_eq!(session.entry_page, "/home");
}

/// The stored event carries defaults, the resolved session and the client IP.
#[tokio::test]
async fn test_event_defaults_and_transport_context() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .add_header("X-Forwarded-For", "203.0.113.7, 10.0.0.2")
        .add_header("User-Agent", "Mozilla/5.0 (Header)")
        .json(&fixtures::event("scroll"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    let event = stored_event(&ctx, body["event_id"].as_str().unwrap()).await;
    assert_eq!(event.user_id, "anonymous");
    assert_eq!(event.page_url, "");
    assert_eq!(event.referrer, "");
    assert_eq!(event.timestamp, T0);
    assert_eq!(event.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(event.user_agent.as_deref(), Some("Mozilla/5.0 (Header)"));
    assert_eq!(event.session_id.as_deref(), body["session_id"].as_str());
}

/// An unknown session id starts a fresh session instead of failing.
#[tokio::test]
async fn test_unknown_session_id_is_replaced() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/api/events/collect")
        .json(&fixtures::in_session("page_view", "sess_does_not_exist", "/landing"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let session_id = body["session_id"].as_str().unwrap();
    assert_ne!(session_id, "sess_does_not_exist");

    let session = stored_session(&ctx, session_id).await;
    assert_eq!(session.total_events, 1);
    assert_eq!(session.page_views, 1);
}

/// A session whose store read fails is recreated, not surfaced as an error.
#[tokio::test]
async fn test_session_read_failure_self_heals() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let first: serde_json::Value = server
        .post("/api/events/collect")
        .json(&fixtures::page_view("/a"))
        .await
        .json();
    let session_id = first["session_id"].as_str().unwrap();

    ctx.store.fail_reads("sessions", true);
    let response = server
        .post("/api/events/collect")
        .json(&fixtures::in_session("click", session_id, "/a"))
        .await;
    response.assert_status_ok();
    let second: serde_json::Value = response.json();
    assert_ne!(second["session_id"], session_id);
    assert_eq!(ctx.memory().len("sessions"), 2);
}

/// Every resolution writes the session, its projection and then the event.
#[tokio::test]
async fn test_write_order_and_projection() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/api/events/collect")
        .json(&fixtures::page_view("/pricing"))
        .await
        .assert_status_ok();

    assert_eq!(
        ctx.store.write_log(),
        vec!["sessions", "active_sessions", "events"]
    );
    assert_eq!(ctx.memory().len("active_sessions"), 1);
}

/// Distinct visitors without session ids get distinct sessions.
#[tokio::test]
async fn test_distinct_visitors_get_distinct_sessions() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let mut ids = std::collections::HashSet::new();
    for _ in 0..5 {
        let body: serde_json::Value = server
            .post("/api/events/collect")
            .json(&fixtures::visitor_page_view("/"))
            .await
            .json();
        ids.insert(body["session_id"].as_str().unwrap().to_string());
    }
    assert_eq!(ids.len(), 5);
    assert_eq!(ctx.memory().len("events"), 5);
}
