//! In-process broadcast notifier.
//!
//! Subscribers (for example an SSE stream per dashboard connection) each get a
//! receiver. Slow receivers lag and lose the oldest snapshots.

use super::{Notification, Notifier, NotifyError};
use tokio::sync::broadcast;

/// Notifier backed by a `tokio::sync::broadcast` channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Creates a notifier buffering up to `capacity` notifications per receiver.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to every notification published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        // Sending fails only when nobody is subscribed; that is not a delivery error.
        if self.sender.send(notification).is_err() {
            tracing::trace!("No subscribers for notification");
        }
        Ok(())
    }
}
