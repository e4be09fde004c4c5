//! Snapshot computation over an event store.

use crate::models::{AnalyticsSnapshot, Bucket, DayBucket, HourBucket, RouteStats};
use crate::storage::{
    AggregateRow, AggregationQuery, EventStore, EventStoreError, GroupKey, GroupValue, SortOrder,
};
use std::sync::Arc;
use thiserror::Error;

/// The five queries a snapshot is assembled from, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotQuery {
    /// Count of all events.
    TotalRequests,
    /// Count per `(method, url)`.
    StatsPerRoute,
    /// Count per weekday, ascending.
    RequestsPerDay,
    /// Count per hour of day, ascending.
    RequestsPerHour,
    /// Mean latency over all events.
    AverageResponseTime,
}

impl SnapshotQuery {
    /// Returns the snapshot field this query fills.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalRequests => "total_requests",
            Self::StatsPerRoute => "stats_per_route",
            Self::RequestsPerDay => "requests_per_day",
            Self::RequestsPerHour => "requests_per_hour",
            Self::AverageResponseTime => "average_response_time",
        }
    }
}

impl std::fmt::Display for SnapshotQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while computing a snapshot.
///
/// Any failing query aborts the whole computation; no partial snapshot is returned.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// A store query failed.
    #[error("{query} query failed: {source}")]
    Query {
        /// The query that failed first.
        query: SnapshotQuery,
        /// The underlying store error.
        #[source]
        source: EventStoreError,
    },

    /// The store returned a group key of the wrong kind.
    #[error("{query} query returned unexpected group {found:?}")]
    UnexpectedGroup {
        /// The query being assembled.
        query: SnapshotQuery,
        /// The offending key.
        found: GroupValue,
    },
}

/// Computes analytics snapshots from an event store.
///
/// Every call re-reads the whole store; nothing is cached between calls.
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn EventStore>,
}

impl AnalyticsEngine {
    /// Creates an engine reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Computes a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first failing query's error.
    pub fn compute_snapshot(&self) -> Result<AnalyticsSnapshot, AggregationError> {
        let total_requests = self
            .store
            .count()
            .map_err(Self::failed(SnapshotQuery::TotalRequests))?;

        let stats_per_route = self.stats_per_route()?;
        let requests_per_day = self.requests_per_day()?;
        let requests_per_hour = self.requests_per_hour()?;
        let average_response_time = self.average_response_time()?;

        tracing::debug!(
            total_requests,
            routes = stats_per_route.len(),
            "Computed analytics snapshot"
        );

        Ok(AnalyticsSnapshot {
            average_response_time,
            stats_per_route,
            requests_per_day,
            requests_per_hour,
            total_requests,
        })
    }

    fn failed(query: SnapshotQuery) -> impl FnOnce(EventStoreError) -> AggregationError {
        move |source| AggregationError::Query { query, source }
    }

    fn run(
        &self,
        query: SnapshotQuery,
        aggregation: &AggregationQuery,
    ) -> Result<Vec<AggregateRow>, AggregationError> {
        self.store
            .aggregate(aggregation)
            .map_err(Self::failed(query))
    }

    fn stats_per_route(&self) -> Result<Vec<RouteStats>, AggregationError> {
        let query = SnapshotQuery::StatsPerRoute;
        self.run(query, &AggregationQuery::count_by(GroupKey::Route))?
            .into_iter()
            .map(|row| match row.key {
                GroupValue::Route(route) => Ok(Bucket::new(route, row.count)),
                found => Err(AggregationError::UnexpectedGroup { query, found }),
            })
            .collect()
    }

    fn requests_per_day(&self) -> Result<Vec<DayBucket>, AggregationError> {
        let query = SnapshotQuery::RequestsPerDay;
        let aggregation = AggregationQuery::count_by(GroupKey::Day).sorted(SortOrder::Ascending);
        self.run(query, &aggregation)?
            .into_iter()
            .map(|row| match row.key {
                GroupValue::Day(day) => Ok(Bucket::new(day, row.count)),
                found => Err(AggregationError::UnexpectedGroup { query, found }),
            })
            .collect()
    }

    fn requests_per_hour(&self) -> Result<Vec<HourBucket>, AggregationError> {
        let query = SnapshotQuery::RequestsPerHour;
        let aggregation = AggregationQuery::count_by(GroupKey::Hour).sorted(SortOrder::Ascending);
        self.run(query, &aggregation)?
            .into_iter()
            .map(|row| match row.key {
                GroupValue::Hour(hour) => Ok(Bucket::new(hour, row.count)),
                found => Err(AggregationError::UnexpectedGroup { query, found }),
            })
            .collect()
    }

    fn average_response_time(&self) -> Result<f64, AggregationError> {
        let rows = self.run(
            SnapshotQuery::AverageResponseTime,
            &AggregationQuery::average_latency(),
        )?;
        Ok(rows
            .first()
            .map(|row| row.value)
            .filter(|value| value.is_finite())
            .unwrap_or(0.0))
    }
}
