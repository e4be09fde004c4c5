//! Data models for Routepulse.
//!
//! This module contains the captured request event and the analytics snapshot
//! derived from stored events.

pub mod event;
pub mod snapshot;

pub use event::{weekday_name, EventValidationError, RequestEvent, WEEKDAY_NAMES};
pub use snapshot::{AnalyticsSnapshot, Bucket, DayBucket, HourBucket, RouteKey, RouteStats};
