//! Aggregate analytics snapshot.
//!
//! The snapshot is derived state: it is recomputed from the full event store on
//! every request and never persisted.

use serde::{Deserialize, Serialize};

/// A `(method, url)` route key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    /// HTTP verb.
    pub method: String,
    /// Request path.
    pub url: String,
}

impl RouteKey {
    /// Creates a route key.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

/// Number of requests observed for one group key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket<K> {
    /// The group key.
    pub id: K,
    /// Number of events in the group.
    pub number_of_requests: u64,
}

impl<K> Bucket<K> {
    /// Creates a bucket.
    #[must_use]
    pub fn new(id: K, number_of_requests: u64) -> Self {
        Self {
            id,
            number_of_requests,
        }
    }
}

/// Requests grouped by `(method, url)`.
pub type RouteStats = Bucket<RouteKey>;

/// Requests grouped by hour of day.
pub type HourBucket = Bucket<u8>;

/// Requests grouped by weekday name.
pub type DayBucket = Bucket<String>;

/// Statistics derived from every stored request event.
///
/// Serialized field names are the dashboard's wire format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    /// Mean latency in seconds, `0.0` when the store is empty.
    pub average_response_time: f64,
    /// Request counts per `(method, url)`, in grouping order.
    pub stats_per_route: Vec<RouteStats>,
    /// Request counts per weekday, ascending by count.
    pub requests_per_day: Vec<DayBucket>,
    /// Request counts per hour of day, ascending by count.
    pub requests_per_hour: Vec<HourBucket>,
    /// Number of events ever stored.
    pub total_requests: u64,
}
