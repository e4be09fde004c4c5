//! Integration tests for the `ClickHouse` event store.
//!
//! Each test works on its own table, created empty and dropped afterwards.
//!
//! These tests require a running ClickHouse instance.
//! Run with: `cargo test -- --ignored`

use api::{AppState, CaptureScope, NotificationTarget};
use axum::http::StatusCode;
use shared::analytics::AnalyticsEngine;
use shared::models::{AnalyticsSnapshot, RequestEvent, RouteKey};
use shared::notify::BroadcastNotifier;
use shared::storage::EventStore;
use tokio_test::assert_ok;

use super::common::{
    create_clickhouse_database, drop_clickhouse_table, fresh_clickhouse_store, get,
    test_app_with_state,
};

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running ClickHouse instance"]
async fn test_clickhouse_append_then_count() {
    let db = create_clickhouse_database();
    let table = "request_analytics_append_count";
    let store = fresh_clickhouse_store(&db, table).await;

    assert_eq!(store.count().unwrap(), 0);
    for latency in [1, 2, 3] {
        assert_ok!(store.append(RequestEvent::new("GET", "/wait/1", latency, "Monday", 9)));
    }
    assert_eq!(store.count().unwrap(), 3);

    drop_clickhouse_table(&db, table).await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running ClickHouse instance"]
async fn test_clickhouse_empty_table_snapshot() {
    let db = create_clickhouse_database();
    let table = "request_analytics_empty";
    let store = fresh_clickhouse_store(&db, table).await;

    let snapshot = AnalyticsEngine::new(store).compute_snapshot().unwrap();

    assert_eq!(snapshot, AnalyticsSnapshot::default());
    assert!(snapshot.average_response_time.abs() < f64::EPSILON);

    drop_clickhouse_table(&db, table).await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running ClickHouse instance"]
async fn test_clickhouse_route_grouping() {
    let db = create_clickhouse_database();
    let table = "request_analytics_routes";
    let store = fresh_clickhouse_store(&db, table).await;

    for method in ["GET", "GET", "POST"] {
        store
            .append(RequestEvent::new(method, "/a", 1, "Tuesday", 10))
            .unwrap();
    }

    let snapshot = AnalyticsEngine::new(store).compute_snapshot().unwrap();

    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.stats_per_route.len(), 2);
    let count_for = |method: &str| {
        snapshot
            .stats_per_route
            .iter()
            .find(|r| r.id == RouteKey::new(method, "/a"))
            .map(|r| r.number_of_requests)
    };
    assert_eq!(count_for("GET"), Some(2));
    assert_eq!(count_for("POST"), Some(1));

    drop_clickhouse_table(&db, table).await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running ClickHouse instance"]
async fn test_clickhouse_buckets_ascending() {
    let db = create_clickhouse_database();
    let table = "request_analytics_buckets";
    let store = fresh_clickhouse_store(&db, table).await;

    let events = [
        ("Friday", 8),
        ("Friday", 8),
        ("Friday", 8),
        ("Monday", 17),
        ("Sunday", 23),
        ("Sunday", 23),
    ];
    for (day, hour) in events {
        store
            .append(RequestEvent::new("GET", "/wait", 2, day, hour))
            .unwrap();
    }

    let snapshot = AnalyticsEngine::new(store).compute_snapshot().unwrap();

    let hours: Vec<(u8, u64)> = snapshot
        .requests_per_hour
        .iter()
        .map(|b| (b.id, b.number_of_requests))
        .collect();
    assert_eq!(hours, vec![(17, 1), (23, 2), (8, 3)]);

    let days: Vec<(&str, u64)> = snapshot
        .requests_per_day
        .iter()
        .map(|b| (b.id.as_str(), b.number_of_requests))
        .collect();
    assert_eq!(days, vec![("Monday", 1), ("Sunday", 2), ("Friday", 3)]);
    assert!((snapshot.average_response_time - 2.0).abs() < f64::EPSILON);

    drop_clickhouse_table(&db, table).await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running ClickHouse instance"]
async fn test_clickhouse_backed_analytics_endpoint() {
    let db = create_clickhouse_database();
    let table = "request_analytics_endpoint";
    let store = fresh_clickhouse_store(&db, table).await;
    store
        .append(RequestEvent::new("GET", "/wait/3", 3, "Monday", 14))
        .unwrap();

    let state = AppState::new(
        store,
        BroadcastNotifier::new(4),
        NotificationTarget::default(),
        CaptureScope::default(),
    );
    let (app, _state) = test_app_with_state(state);

    let (status, response) = get(app, "/api/analytics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_requests"], 1);
    assert_eq!(response["average_response_time"], 3.0);
    assert_eq!(response["requests_per_hour"][0]["id"], 14);
    assert_eq!(response["requests_per_day"][0]["id"], "Monday");

    drop_clickhouse_table(&db, table).await;
}
