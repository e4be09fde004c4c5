//! Request capture middleware.
//!
//! Wraps the request chain, times each request whose path is on the capture
//! allow-list, and once the downstream handler has produced its response:
//! appends a `RequestEvent`, recomputes the analytics snapshot and publishes it.
//! The response itself is passed through untouched, and no failure in the
//! capture path reaches the client.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Local};
use shared::models::RequestEvent;
use shared::notify::{notify_best_effort, Notification};
use std::sync::Arc;
use tokio::time::Instant;

/// Path-prefix allow-list deciding which requests are captured.
///
/// Matching is a plain string prefix test, so `/wait` also covers `/waiting`.
#[derive(Debug, Clone)]
pub struct CaptureScope {
    prefixes: Arc<[String]>,
}

impl CaptureScope {
    /// Creates a scope from a list of path prefixes.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if requests to `path` are captured.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Returns the configured prefixes.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for CaptureScope {
    fn default() -> Self {
        Self::new(["/wait"])
    }
}

/// Timing data taken before the downstream handler runs.
#[derive(Debug)]
struct PendingCapture {
    method: String,
    url: String,
    started_at: DateTime<Local>,
    start: Instant,
}

impl PendingCapture {
    fn start(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            started_at: Local::now(),
            start: Instant::now(),
        }
    }

    fn finish(self) -> RequestEvent {
        RequestEvent::from_timing(self.method, self.url, self.started_at, self.start.elapsed())
    }
}

/// Runs the post-response hook exactly once when dropped.
///
/// The middleware drops the guard right after the handler returns. If the
/// handler panics or the request future is cancelled first, unwinding drops
/// the guard instead, so the request is still recorded.
struct CompletionGuard {
    state: AppState,
    pending: Option<PendingCapture>,
}

impl CompletionGuard {
    fn arm(state: AppState, pending: PendingCapture) -> Self {
        Self {
            state,
            pending: Some(pending),
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            if std::thread::panicking() {
                tracing::warn!(url = %pending.url, "Recording request after handler panic");
            }
            record_completed_request(&self.state, pending);
        }
    }
}

/// Appends the event, refreshes the snapshot and publishes it.
fn record_completed_request(state: &AppState, pending: PendingCapture) {
    let event = pending.finish();
    tracing::debug!(
        url = %event.url,
        method = %event.method,
        latency_seconds = event.latency_seconds,
        "Captured request"
    );

    if let Err(e) = state.event_store().append(event) {
        tracing::error!(error = %e, "Failed to store request event");
    }

    match state.engine().compute_snapshot() {
        Ok(snapshot) => {
            let target = state.notification_target();
            notify_best_effort(
                state.notifier(),
                Notification::new(&target.channel, &target.event, snapshot),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to refresh analytics snapshot");
        }
    }
}

/// Capture middleware, installed with `axum::middleware::from_fn_with_state`.
pub async fn capture_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !state.capture_scope().matches(path) {
        return next.run(request).await;
    }

    let pending = PendingCapture::start(request.method().as_str(), path);
    let guard = CompletionGuard::arm(state, pending);

    let response = next.run(request).await;
    drop(guard);
    response
}
