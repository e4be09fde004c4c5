//! Routepulse Shared Library
//!
//! This crate contains the request-analytics core used by the Routepulse
//! server: the captured event model, the append-only event store, the
//! aggregation engine that derives dashboard statistics, and the notification
//! sink snapshots are pushed through.
//!
//! # Modules
//!
//! - [`models`] - Request events and analytics snapshots
//! - [`storage`] - Event store trait and implementations
//! - [`analytics`] - Snapshot computation over an event store
//! - [`notify`] - Fire-and-forget snapshot notifications
//!
//! # Example
//!
//! ```
//! use shared::analytics::AnalyticsEngine;
//! use shared::models::RequestEvent;
//! use shared::storage::{EventStore, InMemoryEventStore};
//!
//! let store = InMemoryEventStore::new_shared();
//! store
//!     .append(RequestEvent::new("GET", "/wait/3", 3, "Monday", 14))
//!     .unwrap();
//!
//! let snapshot = AnalyticsEngine::new(store).compute_snapshot().unwrap();
//! assert_eq!(snapshot.total_requests, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod analytics;
pub mod models;
pub mod notify;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
