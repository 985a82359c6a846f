//! Dashboard statistics tests over events collected through the API.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

const MINUTE: i64 = 60_000;

async fn collect(server: &TestServer, payload: Value) -> Value {
    let response = server.post("/api/events/collect").json(&payload).await;
    response.assert_status_ok();
    response.json()
}

/// Seeds three page views, one click and a google referral within ten minutes.
async fn seed(ctx: &TestContext, server: &TestServer) -> String {
    let first = collect(server, fixtures::page_view_from("/home", "https://www.google.com/search")).await;
    let session_id = first["session_id"].as_str().unwrap().to_string();

    ctx.advance_ms(2 * MINUTE);
    collect(server, fixtures::in_session("click", &session_id, "/home")).await;
    ctx.advance_ms(2 * MINUTE);
    collect(server, fixtures::in_session("page_view", &session_id, "/pricing")).await;
    ctx.advance_ms(MINUTE);
    collect(server, fixtures::page_view("/home")).await;
    session_id
}

#[tokio::test]
async fn test_empty_store_views_are_zeroed() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let hourly: Vec<Value> = server.get("/api/statistics/hourly").await.json();
    assert_eq!(hourly.len(), 20);
    assert!(hourly.iter().all(|b| b["count"] == 0));

    let summary: Value = server.get("/api/statistics/summary").await.json();
    assert_eq!(summary["total_sessions"], 0);
    assert_eq!(summary["total_events"], 0);
    assert_eq!(summary["avg_session_time"], "0m 0s");
    assert_eq!(summary["conversion_rate"], "0.0%");

    let pages: Vec<Value> = server.get("/api/statistics/pages").await.json();
    assert!(pages.is_empty());
}

#[tokio::test]
async fn test_hourly_histogram_counts_events() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    seed(&ctx, &server).await;

    let hourly: Vec<Value> = server
        .get("/api/statistics/hourly")
        .add_query_param("bucket_count", "12")
        .add_query_param("bucket_width", "10")
        .await
        .json();
    assert_eq!(hourly.len(), 12);
    let total: u64 = hourly.iter().map(|b| b["count"].as_u64().unwrap()).sum();
    assert_eq!(total, 4);

    let labels: Vec<&str> = hourly.iter().map(|b| b["label"].as_str().unwrap()).collect();
    assert_eq!(labels.last(), Some(&"14:10"));
    assert_eq!(labels.first(), Some(&"12:20"));
}

#[tokio::test]
async fn test_unparsable_params_fall_back_and_out_of_range_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let hourly: Vec<Value> = server
        .get("/api/statistics/hourly")
        .add_query_param("bucket_count", "lots")
        .await
        .json();
    assert_eq!(hourly.len(), 20);

    let response = server
        .get("/api/statistics/hourly")
        .add_query_param("bucket_count", "0")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "PARAM_002");
}

#[tokio::test]
async fn test_top_pages_and_referrers() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    seed(&ctx, &server).await;

    let pages: Vec<Value> = server.get("/api/statistics/pages").await.json();
    assert_eq!(pages[0]["page"], "/home");
    assert_eq!(pages[0]["views"], 2);
    assert_eq!(pages[1]["page"], "/pricing");
    assert_eq!(pages[1]["views"], 1);

    let limited: Vec<Value> = server
        .get("/api/statistics/pages")
        .add_query_param("limit", "1")
        .await
        .json();
    assert_eq!(limited.len(), 1);

    let referrers: Vec<Value> = server.get("/api/statistics/referrers").await.json();
    assert_eq!(referrers[0]["label"], "Direct");
    assert_eq!(referrers[0]["count"], 2);
    assert_eq!(referrers[1]["label"], "Google");
    assert_eq!(referrers[1]["count"], 1);
}

#[tokio::test]
async fn test_summary_sessions_and_realtime() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    seed(&ctx, &server).await;
    ctx.advance_ms(MINUTE);

    let summary: Value = server.get("/api/statistics/summary").await.json();
    assert_eq!(summary["total_sessions"], 2);
    assert_eq!(summary["total_events"], 4);
    // Idle times of 2m and 1m
    assert_eq!(summary["avg_session_time"], "1m 30s");

    let stats: Value = server.get("/api/statistics/sessions").await.json();
    assert_eq!(stats["total_sessions"], 2);
    assert_eq!(stats["active_sessions"], 2);
    assert_eq!(stats["avg_page_views"], 1.5);
    assert_eq!(stats["bounce_rate"], 0.5);

    let realtime: Value = server.get("/api/statistics/realtime").await.json();
    assert_eq!(realtime["total_events"], 4);
    assert_eq!(realtime["page_views"], 3);
    assert_eq!(realtime["clicks"], 1);
    assert_eq!(realtime["hourly_distribution"]["14:00"], 4);
}

#[tokio::test]
async fn test_active_sessions_expire() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let session_id = seed(&ctx, &server).await;

    let active: Vec<Value> = server.get("/api/sessions/active").await.json();
    assert_eq!(active.len(), 2);
    assert_ne!(active[0]["session_id"], session_id.as_str());
    assert_eq!(active[1]["session_id"], session_id.as_str());
    assert_eq!(active[1]["current_page"], "/pricing");
    assert_eq!(active[1]["duration"], MINUTE);

    ctx.advance_ms(31 * MINUTE);
    let active: Vec<Value> = server.get("/api/sessions/active").await.json();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_session_events_in_order() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let session_id = seed(&ctx, &server).await;

    let events: Vec<Value> = server
        .get(&format!("/api/sessions/{}/events", session_id))
        .await
        .json();
    let types: Vec<&str> = events.iter().map(|e| e["event_type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["page_view", "click", "page_view"]);
}

#[tokio::test]
async fn test_detail_views() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    seed(&ctx, &server).await;

    let hour: Value = server
        .get("/api/statistics/hourly/details")
        .add_query_param("hour", "14:05")
        .await
        .json();
    assert_eq!(hour["hour"], "14:05");
    assert_eq!(hour["total_events"], 2);
    assert_eq!(hour["events"][0]["formatted_time"], "14:09:09");

    let page: Value = server
        .get("/api/statistics/pages/details")
        .add_query_param("page", "/home")
        .await
        .json();
    assert_eq!(page["total_views"], 2);
    assert_eq!(page["recent_events"].as_array().unwrap().len(), 2);
    assert_eq!(page["hourly_distribution"]["14:00"], 2);

    let referrer: Value = server
        .get("/api/statistics/referrers/details")
        .add_query_param("referrer", "Google")
        .await
        .json();
    assert_eq!(referrer["total_visitors"], 1);
    assert_eq!(referrer["recent_visits"][0]["landing_page"], "/home");
    assert_eq!(referrer["recent_visits"][0]["formatted_time"], "03/05 14:07");
}

#[tokio::test]
async fn test_detail_views_require_key() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for path in [
        "/api/statistics/hourly/details",
        "/api/statistics/pages/details",
        "/api/statistics/referrers/details",
    ] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(response.json::<Value>()["code"], "PARAM_001");
    }
}

#[tokio::test]
async fn test_store_outage_degrades_views_not_requests() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    seed(&ctx, &server).await;

    ctx.store.fail_reads("events", true);

    let pages = server.get("/api/statistics/pages").await;
    pages.assert_status_ok();
    assert!(pages.json::<Vec<Value>>().is_empty());

    let summary: Value = server.get("/api/statistics/summary").await.json();
    assert_eq!(summary["total_events"], 0);

    // Views over other tables are unaffected
    let active: Vec<Value> = server.get("/api/sessions/active").await.json();
    assert_eq!(active.len(), 2);
}
