//! Analytics endpoints.
//!
//! `GET /api/analytics` returns a freshly computed snapshot.
//! `GET /api/analytics/stream` pushes every snapshot published after a
//! captured request as a Server-Sent Event.

use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};

/// Message returned when a snapshot cannot be computed.
pub const ANALYTICS_ERROR_MESSAGE: &str = "An error occurred while fetching analytics data";

/// Error body for the analytics endpoint.
///
/// The underlying store error is logged, never returned.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsErrorResponse {
    /// Static error message.
    pub message: String,
    /// Unix timestamp (seconds) of the failure.
    pub timestamp: i64,
}

impl AnalyticsErrorResponse {
    fn now() -> Self {
        Self {
            message: ANALYTICS_ERROR_MESSAGE.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Creates the analytics routes.
///
/// # Routes
///
/// - `GET /api/analytics` - Current analytics snapshot
/// - `GET /api/analytics/stream` - Snapshot push stream (SSE)
pub fn analytics_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/analytics", get(get_analytics))
        .route("/api/analytics/stream", get(analytics_stream))
        .with_state(state)
}

/// Handler for GET /api/analytics.
///
/// Aggregation failures answer 500 with a fixed body.
async fn get_analytics(State(state): State<AppState>) -> Response {
    match state.engine().compute_snapshot() {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute analytics snapshot");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnalyticsErrorResponse::now()),
            )
                .into_response()
        }
    }
}

/// Handler for GET /api/analytics/stream.
///
/// Forwards notifications on the configured channel. A subscriber that falls
/// behind skips the snapshots it missed.
async fn analytics_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let channel = state.notification_target().channel.clone();
    let receiver = state.feed().subscribe();

    let stream = BroadcastStream::new(receiver).filter_map(move |message| match message {
        Ok(notification) if notification.channel == channel => {
            match Event::default()
                .event(&notification.event)
                .json_data(&notification.payload)
            {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode snapshot event");
                    None
                }
            }
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "Dashboard stream lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
