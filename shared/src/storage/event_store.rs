//! Request event storage trait and implementations.
//!
//! Provides the append-only `EventStore` trait, the grouped aggregation query
//! it answers, an `InMemoryEventStore` for development and testing, and a
//! `ClickHouseEventStore` for production use.

use crate::models::{EventValidationError, RequestEvent, RouteKey};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Name of the table (or collection) holding request events.
pub const EVENTS_TABLE: &str = "request_analytics";

/// Errors that can occur during event store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on event store")]
    LockError,

    /// The event was rejected before being written.
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] EventValidationError),

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Key expression events are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// A single group spanning every event.
    All,
    /// The `(method, url)` pair.
    Route,
    /// Hour of day.
    Hour,
    /// Weekday name.
    Day,
}

/// Aggregate computed for each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFunction {
    /// Number of events in the group.
    Count,
    /// Mean of `latency_seconds` over the group.
    AverageLatency,
}

/// Ordering applied to groups by their aggregate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest aggregate first.
    Ascending,
    /// Largest aggregate first.
    Descending,
}

/// A grouped aggregation: group all events by `group_by`, compute `function`
/// per group, then optionally sort groups by the computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationQuery {
    /// Grouping key.
    pub group_by: GroupKey,
    /// Per-group aggregate.
    pub function: AggregationFunction,
    /// Optional ordering by aggregate value.
    pub sort: Option<SortOrder>,
}

impl AggregationQuery {
    /// Creates an unsorted aggregation query.
    #[must_use]
    pub const fn new(group_by: GroupKey, function: AggregationFunction) -> Self {
        Self {
            group_by,
            function,
            sort: None,
        }
    }

    /// Counts events per group.
    #[must_use]
    pub const fn count_by(group_by: GroupKey) -> Self {
        Self::new(group_by, AggregationFunction::Count)
    }

    /// Averages latency over all events.
    #[must_use]
    pub const fn average_latency() -> Self {
        Self::new(GroupKey::All, AggregationFunction::AverageLatency)
    }

    /// Sorts groups by aggregate value.
    #[must_use]
    pub const fn sorted(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }
}

/// The concrete key of one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupValue {
    /// The single all-events group.
    All,
    /// A `(method, url)` route.
    Route(RouteKey),
    /// An hour of day.
    Hour(u8),
    /// A weekday name.
    Day(String),
}

impl GroupValue {
    fn of(key: GroupKey, event: &RequestEvent) -> Self {
        match key {
            GroupKey::All => Self::All,
            GroupKey::Route => Self::Route(RouteKey::new(&event.method, &event.url)),
            GroupKey::Hour => Self::Hour(event.hour_of_day),
            GroupKey::Day => Self::Day(event.day_of_week.clone()),
        }
    }
}

/// One group produced by an aggregation query.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// The group key.
    pub key: GroupValue,
    /// The aggregate value (a count is reported as a float too).
    pub value: f64,
    /// Number of events in the group.
    pub count: u64,
}

/// Trait for request event storage implementations.
///
/// The store is append-only. Implementations must be thread-safe (Send + Sync)
/// and tolerate concurrent appends and reads; callers add no locking of their own.
pub trait EventStore: Send + Sync {
    /// Appends a single event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is invalid or the storage operation fails.
    fn append(&self, event: RequestEvent) -> Result<(), EventStoreError>;

    /// Returns the total number of events in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<u64, EventStoreError>;

    /// Runs a grouped aggregation over every stored event.
    ///
    /// An empty store produces no groups, including for `GroupKey::All`.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregation operation fails.
    fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<AggregateRow>, EventStoreError>;
}

/// In-memory event store implementation.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<RequestEvent>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory event store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: RequestEvent) -> Result<(), EventStoreError> {
        event.validate_event()?;
        let mut events = self
            .events
            .write()
            .map_err(|_| EventStoreError::LockError)?;
        events.push(event);
        Ok(())
    }

    fn count(&self) -> Result<u64, EventStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventStoreError::LockError)?;
        Ok(events.len() as u64)
    }

    fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<AggregateRow>, EventStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventStoreError::LockError)?;

        // (key, latency sum, count) in first-seen order
        let mut groups: Vec<(GroupValue, u64, u64)> = Vec::new();
        let mut index: HashMap<GroupValue, usize> = HashMap::new();

        for event in events.iter() {
            let key = GroupValue::of(query.group_by, event);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push((key, 0, 0));
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.1 += event.latency_seconds;
            group.2 += 1;
        }
        drop(events);

        #[allow(clippy::cast_precision_loss)]
        let mut rows: Vec<AggregateRow> = groups
            .into_iter()
            .map(|(key, latency_sum, count)| {
                let value = match query.function {
                    AggregationFunction::Count => count as f64,
                    AggregationFunction::AverageLatency => latency_sum as f64 / count as f64,
                };
                AggregateRow { key, value, count }
            })
            .collect();

        match query.sort {
            Some(SortOrder::Ascending) => rows.sort_by(|a, b| a.value.total_cmp(&b.value)),
            Some(SortOrder::Descending) => rows.sort_by(|a, b| b.value.total_cmp(&a.value)),
            None => {}
        }

        Ok(rows)
    }
}

/// `ClickHouse`-backed event store implementation.
///
/// Events live in the `request_analytics` table unless another table is
/// named; aggregations are pushed down as `GROUP BY` queries.
#[derive(Clone)]
pub struct ClickHouseEventStore {
    client: Arc<clickhouse::Client>,
    table: String,
}

#[derive(clickhouse::Row, serde::Serialize)]
struct EventRow {
    url: String,
    method: String,
    latency_seconds: u64,
    day_of_week: String,
    hour_of_day: u8,
}

impl From<RequestEvent> for EventRow {
    fn from(event: RequestEvent) -> Self {
        Self {
            url: event.url,
            method: event.method,
            latency_seconds: event.latency_seconds,
            day_of_week: event.day_of_week,
            hour_of_day: event.hour_of_day,
        }
    }
}

impl ClickHouseEventStore {
    /// Creates a new `ClickHouse` event store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self::with_table(client, EVENTS_TABLE)
    }

    /// Creates a store over a table other than `request_analytics`.
    #[must_use]
    pub fn with_table(client: Arc<clickhouse::Client>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Returns the table events are written to.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates a new `ClickHouse` event store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    /// Creates the events table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub fn ensure_schema(&self) -> Result<(), EventStoreError> {
        let client = Arc::clone(&self.client);
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                url String,
                method LowCardinality(String),
                latency_seconds UInt64,
                day_of_week LowCardinality(String),
                hour_of_day UInt8,
                recorded_at DateTime DEFAULT now()
            ) ENGINE = MergeTree ORDER BY recorded_at",
            self.table
        );
        Self::block_on(async move { client.query(&ddl).execute().await })
    }

    /// Helper to execute async operations synchronously.
    fn block_on<F, T>(future: F) -> Result<T, EventStoreError>
    where
        F: std::future::Future<Output = Result<T, clickhouse::error::Error>>,
    {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(future)
                .map_err(|e| EventStoreError::StorageError(e.to_string()))
        })
    }

    fn aggregate_sql(&self, query: &AggregationQuery) -> String {
        let table = &self.table;
        let agg_func = match query.function {
            AggregationFunction::Count => "toFloat64(count())",
            AggregationFunction::AverageLatency => "avg(latency_seconds)",
        };
        let group_columns = match query.group_by {
            GroupKey::All => None,
            GroupKey::Route => Some("method, url"),
            GroupKey::Hour => Some("hour_of_day"),
            GroupKey::Day => Some("day_of_week"),
        };

        let mut sql = match group_columns {
            Some(columns) => format!(
                "SELECT {columns}, {agg_func} AS agg_value, count() AS sample_count \
                 FROM {table} GROUP BY {columns}"
            ),
            None => format!(
                "SELECT {agg_func} AS agg_value, count() AS sample_count FROM {table}"
            ),
        };

        match query.sort {
            Some(SortOrder::Ascending) => sql.push_str(" ORDER BY agg_value ASC"),
            Some(SortOrder::Descending) => sql.push_str(" ORDER BY agg_value DESC"),
            None => {}
        }

        sql
    }
}

impl EventStore for ClickHouseEventStore {
    fn append(&self, event: RequestEvent) -> Result<(), EventStoreError> {
        event.validate_event()?;

        let client = Arc::clone(&self.client);
        let table = self.table.clone();
        let row = EventRow::from(event);
        Self::block_on(async move {
            let mut inserter = client.insert::<EventRow>(&table).await?;
            inserter.write(&row).await?;
            inserter.end().await
        })
    }

    fn count(&self) -> Result<u64, EventStoreError> {
        let client = Arc::clone(&self.client);
        let sql = format!("SELECT count() FROM {}", self.table);
        Self::block_on(async move { client.query(&sql).fetch_one::<u64>().await })
    }

    fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<AggregateRow>, EventStoreError> {
        #[derive(clickhouse::Row, serde::Deserialize)]
        struct AllRow {
            agg_value: f64,
            sample_count: u64,
        }

        #[derive(clickhouse::Row, serde::Deserialize)]
        struct RouteRow {
            method: String,
            url: String,
            agg_value: f64,
            sample_count: u64,
        }

        #[derive(clickhouse::Row, serde::Deserialize)]
        struct HourRow {
            hour_of_day: u8,
            agg_value: f64,
            sample_count: u64,
        }

        #[derive(clickhouse::Row, serde::Deserialize)]
        struct DayRow {
            day_of_week: String,
            agg_value: f64,
            sample_count: u64,
        }

        let sql = self.aggregate_sql(query);
        let client = Arc::clone(&self.client);

        match query.group_by {
            GroupKey::All => {
                let rows: Vec<AllRow> =
                    Self::block_on(async move { client.query(&sql).fetch_all::<AllRow>().await })?;
                // An ungrouped aggregate over an empty table still yields one row.
                Ok(rows
                    .into_iter()
                    .filter(|r| r.sample_count > 0)
                    .map(|r| AggregateRow {
                        key: GroupValue::All,
                        value: r.agg_value,
                        count: r.sample_count,
                    })
                    .collect())
            }
            GroupKey::Route => {
                let rows: Vec<RouteRow> = Self::block_on(async move {
                    client.query(&sql).fetch_all::<RouteRow>().await
                })?;
                Ok(rows
                    .into_iter()
                    .map(|r| AggregateRow {
                        key: GroupValue::Route(RouteKey::new(r.method, r.url)),
                        value: r.agg_value,
                        count: r.sample_count,
                    })
                    .collect())
            }
            GroupKey::Hour => {
                let rows: Vec<HourRow> = Self::block_on(async move {
                    client.query(&sql).fetch_all::<HourRow>().await
                })?;
                Ok(rows
                    .into_iter()
                    .map(|r| AggregateRow {
                        key: GroupValue::Hour(r.hour_of_day),
                        value: r.agg_value,
                        count: r.sample_count,
                    })
                    .collect())
            }
            GroupKey::Day => {
                let rows: Vec<DayRow> = Self::block_on(async move {
                    client.query(&sql).fetch_all::<DayRow>().await
                })?;
                Ok(rows
                    .into_iter()
                    .map(|r| AggregateRow {
                        key: GroupValue::Day(r.day_of_week),
                        value: r.agg_value,
                        count: r.sample_count,
                    })
                    .collect())
            }
        }
    }
}
