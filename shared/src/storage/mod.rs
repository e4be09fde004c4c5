//! Storage traits and implementations.
//!
//! This module provides the abstraction for storing request events and running
//! grouped aggregations over them. The `EventStore` trait defines the interface,
//! allowing different implementations (in-memory, database-backed, etc.).

pub mod event_store;

pub use event_store::{
    AggregateRow, AggregationFunction, AggregationQuery, ClickHouseEventStore, EventStore,
    EventStoreError, GroupKey, GroupValue, InMemoryEventStore, SortOrder, EVENTS_TABLE,
};
