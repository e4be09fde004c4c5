//! Integration tests for health check and general API functionality.
//!
//! Tests cover:
//! - Health check endpoint
//! - Empty store behavior

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "routepulse-api");
    assert_eq!(response["capture_prefixes"], serde_json::json!(["/wait"]));
}

#[tokio::test]
async fn test_empty_store_returns_zero_snapshot() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/api/analytics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_requests"], 0);
    assert_eq!(response["average_response_time"], 0.0);
    assert!(response["stats_per_route"].as_array().unwrap().is_empty());
    assert!(response["requests_per_day"].as_array().unwrap().is_empty());
    assert!(response["requests_per_hour"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, state) = test_app();

    let (status, _response) = get(app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.event_store().count().unwrap(), 0);
}
