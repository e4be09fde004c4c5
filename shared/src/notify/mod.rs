//! Notification sink for pushing fresh snapshots to dashboards.
//!
//! Delivery is fire-and-forget and at-most-once: publishers never wait for an
//! acknowledgment and failed publishes are logged, not retried.

pub mod broadcast;

pub use broadcast::BroadcastNotifier;

use crate::models::AnalyticsSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default channel snapshots are published on.
pub const DEFAULT_CHANNEL: &str = "analytics_dashboard";

/// Default event name carried by snapshot notifications.
pub const DEFAULT_EVENT: &str = "data";

/// Errors that can occur while publishing a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The underlying transport rejected the publish.
    #[error("Notification transport error: {0}")]
    Transport(String),
}

/// One named event on a named channel, carrying a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Channel name, e.g. "`analytics_dashboard`".
    pub channel: String,
    /// Event name, e.g. "data".
    pub event: String,
    /// The snapshot being pushed.
    pub payload: AnalyticsSnapshot,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(
        channel: impl Into<String>,
        event: impl Into<String>,
        payload: AnalyticsSnapshot,
    ) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Trait for notification sinks.
///
/// Implementations must be thread-safe (Send + Sync) and must not block on
/// subscribers.
pub trait Notifier: Send + Sync {
    /// Publishes a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the publish.
    fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Publishes a notification, logging and discarding any failure.
pub fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    let channel = notification.channel.clone();
    let event = notification.event.clone();
    if let Err(e) = notifier.publish(notification) {
        tracing::warn!(error = %e, %channel, %event, "Failed to publish notification");
    }
}
