//! Analytics derived from stored request events.
//!
//! The [`AnalyticsEngine`] turns the event store into an [`AnalyticsSnapshot`]
//! by running five independent queries and assembling their results.
//!
//! [`AnalyticsSnapshot`]: crate::models::AnalyticsSnapshot

pub mod engine;

pub use engine::{AggregationError, AnalyticsEngine, SnapshotQuery};
