//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers and
//! the capture middleware. Every handle is constructed once at startup and
//! cloned into each request; there is no global state.

use crate::capture::CaptureScope;
use shared::analytics::AnalyticsEngine;
use shared::notify::{BroadcastNotifier, Notifier, DEFAULT_CHANNEL, DEFAULT_EVENT};
use shared::storage::{EventStore, InMemoryEventStore};
use std::sync::Arc;

/// Default number of snapshots buffered per dashboard subscriber.
const DEFAULT_FEED_CAPACITY: usize = 64;

/// Channel and event name snapshots are published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    /// Channel name.
    pub channel: String,
    /// Event name.
    pub event: String,
}

impl NotificationTarget {
    /// Creates a notification target.
    pub fn new(channel: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
        }
    }
}

impl Default for NotificationTarget {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL, DEFAULT_EVENT)
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The event storage backend.
    event_store: Arc<dyn EventStore>,
    /// Snapshot computation over `event_store`.
    engine: AnalyticsEngine,
    /// In-process feed the dashboard stream subscribes to.
    feed: BroadcastNotifier,
    /// Sink captured snapshots are published to.
    notifier: Arc<dyn Notifier>,
    /// Where snapshots are published.
    target: NotificationTarget,
    /// Which request paths are captured.
    scope: CaptureScope,
}

impl AppState {
    /// Creates a new application state.
    ///
    /// Snapshots are published to `feed`; use [`AppState::with_notifier`] to
    /// publish somewhere else.
    pub fn new(
        event_store: Arc<dyn EventStore>,
        feed: BroadcastNotifier,
        target: NotificationTarget,
        scope: CaptureScope,
    ) -> Self {
        Self {
            engine: AnalyticsEngine::new(Arc::clone(&event_store)),
            event_store,
            notifier: Arc::new(feed.clone()),
            feed,
            target,
            scope,
        }
    }

    /// Creates a new application state with an in-memory store and default
    /// settings.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::new(
            InMemoryEventStore::new_shared(),
            BroadcastNotifier::new(DEFAULT_FEED_CAPACITY),
            NotificationTarget::default(),
            CaptureScope::default(),
        )
    }

    /// Replaces the sink snapshots are published to.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Returns a reference to the event store.
    #[must_use]
    pub fn event_store(&self) -> &dyn EventStore {
        self.event_store.as_ref()
    }

    /// Returns the analytics engine.
    #[must_use]
    pub fn engine(&self) -> &AnalyticsEngine {
        &self.engine
    }

    /// Returns the dashboard feed.
    #[must_use]
    pub fn feed(&self) -> &BroadcastNotifier {
        &self.feed
    }

    /// Returns the notification sink.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Returns the notification channel and event.
    #[must_use]
    pub fn notification_target(&self) -> &NotificationTarget {
        &self.target
    }

    /// Returns the capture allow-list.
    #[must_use]
    pub fn capture_scope(&self) -> &CaptureScope {
        &self.scope
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}
