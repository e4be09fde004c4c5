//! Demonstration endpoint with a controllable delay.

use axum::{extract::Path, routing::get, Router};
use std::time::Duration;

/// Shortest delay the wait endpoint applies, in seconds.
pub const MIN_WAIT_SECONDS: u64 = 2;

/// Creates the wait routes.
///
/// # Routes
///
/// - `GET /wait/{seconds}` - Sleeps, then answers `Done`
pub fn wait_routes() -> Router {
    Router::new().route("/wait/{seconds}", get(wait))
}

/// Returns the delay for a raw path segment.
///
/// Values that do not parse as whole seconds, or are not above the minimum,
/// fall back to the minimum.
#[must_use]
pub fn wait_duration(raw: &str) -> Duration {
    let seconds = raw
        .parse::<u64>()
        .ok()
        .filter(|&s| s > MIN_WAIT_SECONDS)
        .unwrap_or(MIN_WAIT_SECONDS);
    Duration::from_secs(seconds)
}

/// Handler for GET /wait/{seconds}.
async fn wait(Path(seconds): Path<String>) -> &'static str {
    let delay = wait_duration(&seconds);
    tracing::info!(requested = %seconds, delay_seconds = delay.as_secs(), "Waiting");
    tokio::time::sleep(delay).await;
    "Done"
}
