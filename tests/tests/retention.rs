//! Retention over collected data.
//!
//! Collect → expire → RetentionWorker purge

use std::sync::Arc;

use analytics::AnalyticsConfig;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use store::{Store, TableNames};
use telemetry::metrics;
use worker::RetentionWorker;

const MINUTE: i64 = 60_000;
const DAY: i64 = 24 * 60 * MINUTE;

fn retention(ctx: &TestContext) -> RetentionWorker {
    let store: Arc<dyn Store> = Arc::new(ctx.store.clone());
    RetentionWorker::new(store, TableNames::default(), Arc::new(ctx.clock.clone()))
}

#[tokio::test]
async fn test_projections_then_events_are_purged() {
    let ctx = TestContext::with_config(AnalyticsConfig {
        cache_ttl_secs: 0,
        event_ttl_days: Some(1),
        ..Default::default()
    })
    .await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let worker = retention(&ctx);

    server
        .post("/api/events/collect")
        .json(&fixtures::page_view("/home"))
        .await
        .assert_status_ok();

    let report = worker.run().await.expect("retention pass");
    assert_eq!(report.total(), 0);

    // Past the active horizon the projection goes, the event stays
    ctx.advance_ms(31 * MINUTE);
    let purged_before = metrics().items_purged.get();
    let report = worker.run().await.expect("retention pass");
    assert_eq!(report.projections, 1);
    assert_eq!(report.events, 0);
    assert!(metrics().items_purged.get() >= purged_before + 1);
    assert!(ctx.memory().is_empty("active_sessions"));
    assert_eq!(ctx.memory().len("events"), 1);

    ctx.advance_ms(DAY);
    let report = worker.run().await.expect("retention pass");
    assert_eq!(report.events, 1);
    assert!(ctx.memory().is_empty("events"));

    // Sessions carry no expiry
    assert_eq!(ctx.memory().len("sessions"), 1);
}

#[tokio::test]
async fn test_events_kept_without_ttl() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/api/events/collect")
        .json(&fixtures::event("click"))
        .await
        .assert_status_ok();

    ctx.advance_ms(30 * DAY);
    let report = retention(&ctx).run().await.expect("retention pass");
    assert_eq!(report.events, 0);
    assert_eq!(report.projections, 1);
    assert_eq!(ctx.memory().len("events"), 1);
}

#[tokio::test]
async fn test_purge_failure_is_reported() {
    let ctx = TestContext::new().await;
    ctx.store.fail_writes("active_sessions", true);

    let err = retention(&ctx).run().await.unwrap_err();
    assert_eq!(err.code(), "STORE_001");
}
