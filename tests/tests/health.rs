//! Tests for health check endpoints.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::TestContext;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["store_backend"], "flaky-memory");
    assert_eq!(body["store_connected"], true);
    assert!(body.get("store_error").is_none());

    // Other tests in this binary flip the shared registry concurrently
    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );
}

/// Test /health/ready follows store connectivity
#[tokio::test]
async fn test_ready_endpoint_tracks_store() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/ready").await.assert_status_ok();

    ctx.memory().set_fail_reads(true);
    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["store_connected"], false);
    assert!(body["store_error"].as_str().unwrap().contains("reads disabled"));

    ctx.memory().set_fail_reads(false);
    server.get("/health/ready").await.assert_status_ok();
}

/// Test /health/live endpoint always returns 200 when service is running
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.memory().set_fail_reads(true);
    server.get("/health/live").await.assert_status_ok();
}
