//! Integration tests for request capture.
//!
//! Tests cover:
//! - Which paths produce events
//! - Latency measurement over the wait endpoint
//! - Snapshot publication after each captured request
//! - Responses passing through untouched when capture fails

use std::sync::Arc;

use api::{capture_middleware, AppState, CaptureScope, NotificationTarget};
use axum::http::StatusCode;
use axum::{middleware, routing::get as get_route, Router};
use shared::models::AnalyticsSnapshot;
use shared::notify::BroadcastNotifier;
use tower_http::catch_panic::CatchPanicLayer;

use super::common::{
    get, get_raw, test_app, test_app_with_state, UnavailableStore, UnreachableNotifier,
};

#[tokio::test]
async fn test_non_instrumented_paths_not_recorded() {
    let (app, state) = test_app();

    get(app.clone(), "/health").await;
    get(app.clone(), "/api/analytics").await;
    get(app, "/missing").await;

    assert_eq!(state.event_store().count().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_request_recorded_with_latency() {
    let (app, state) = test_app();

    let (status, _headers, body) = get_raw(app.clone(), "/wait/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"Done");

    let (_, snapshot) = get(app, "/api/analytics").await;
    assert_eq!(snapshot["total_requests"], 1);
    assert_eq!(snapshot["average_response_time"], 3.0);
    assert_eq!(snapshot["stats_per_route"][0]["id"]["method"], "GET");
    assert_eq!(snapshot["stats_per_route"][0]["id"]["url"], "/wait/3");
    assert_eq!(state.event_store().count().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_url_excludes_query_string() {
    let (app, state) = test_app();

    get_raw(app, "/wait/1?verbose=true").await;

    let snapshot = state.engine().compute_snapshot().unwrap();
    assert_eq!(snapshot.stats_per_route[0].id.url, "/wait/1");
    assert_eq!(snapshot.average_response_time, 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_published_per_captured_request() {
    let (app, state) = test_app();
    let mut receiver = state.feed().subscribe();

    get_raw(app.clone(), "/wait/2").await;
    get_raw(app.clone(), "/health").await;
    get_raw(app, "/wait/5").await;

    let first = receiver.try_recv().unwrap();
    assert_eq!(first.channel, "analytics_dashboard");
    assert_eq!(first.event, "data");
    assert_eq!(first.payload.total_requests, 1);

    let second = receiver.try_recv().unwrap();
    assert_eq!(second.payload.total_requests, 2);
    assert_eq!(second.payload, state.engine().compute_snapshot().unwrap());

    assert!(receiver.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_custom_channel_and_scope() {
    let state = AppState::new(
        shared::storage::InMemoryEventStore::new_shared(),
        BroadcastNotifier::new(4),
        NotificationTarget::new("ops_dashboard", "snapshot"),
        CaptureScope::new(["/health"]),
    );
    let (app, state) = test_app_with_state(state);
    let mut receiver = state.feed().subscribe();

    get_raw(app.clone(), "/health").await;
    get_raw(app, "/wait/3").await;

    let notification = receiver.try_recv().unwrap();
    assert_eq!(notification.channel, "ops_dashboard");
    assert_eq!(notification.event, "snapshot");
    assert_eq!(state.event_store().count().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_response_unchanged_when_capture_fails() {
    let (plain_app, _) = test_app();
    let (plain_status, plain_headers, plain_body) = get_raw(plain_app, "/wait/3").await;

    let failing = AppState::new(
        Arc::new(UnavailableStore),
        BroadcastNotifier::new(4),
        NotificationTarget::default(),
        CaptureScope::default(),
    )
    .with_notifier(Arc::new(UnreachableNotifier));
    let (failing_app, _) = test_app_with_state(failing);
    let (status, headers, body) = get_raw(failing_app, "/wait/3").await;

    assert_eq!(status, plain_status);
    assert_eq!(body, plain_body);
    assert_eq!(headers, plain_headers);
}

#[tokio::test(start_paused = true)]
async fn test_response_unchanged_by_middleware() {
    let bare = Router::new().route("/wait/{seconds}", get_route(|| async { "Done" }));
    let (bare_status, bare_headers, bare_body) = get_raw(bare.clone(), "/wait/0").await;

    let state = AppState::with_in_memory_store();
    let wrapped = bare.layer(middleware::from_fn_with_state(
        state.clone(),
        capture_middleware,
    ));
    let (status, headers, body) = get_raw(wrapped, "/wait/0").await;

    assert_eq!(status, bare_status);
    assert_eq!(headers, bare_headers);
    assert_eq!(body, bare_body);
    assert_eq!(state.event_store().count().unwrap(), 1);
}

async fn explode() -> &'static str {
    panic!("handler failed")
}

#[tokio::test]
async fn test_panicking_handler_still_recorded() {
    let state = AppState::with_in_memory_store();
    let app = Router::new()
        .route("/wait/boom", get_route(explode))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            capture_middleware,
        ));

    let (status, _headers, _body) = get_raw(app, "/wait/boom").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let snapshot: AnalyticsSnapshot = state.engine().compute_snapshot().unwrap();
    assert_eq!(snapshot.total_requests, 1);
    assert_eq!(snapshot.stats_per_route[0].id.url, "/wait/boom");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_all_recorded() {
    let (app, state) = test_app();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move { get_raw(app, &format!("/wait/{}", i % 4)).await })
        })
        .collect();
    for handle in handles {
        let (status, _, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let snapshot = state.engine().compute_snapshot().unwrap();
    assert_eq!(snapshot.total_requests, 8);
    assert_eq!(snapshot.stats_per_route.len(), 4);
}
