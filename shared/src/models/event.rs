//! Request event data model.
//!
//! A `RequestEvent` is the durable record of one captured HTTP request: what was
//! called, how long it took, and when (in local server time) it started.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Full English weekday names, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Returns the full English name of a weekday (e.g. "Monday").
#[must_use]
pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_monday() as usize]
}

/// One captured request.
///
/// Events are immutable once written: the store is append-only and nothing in
/// this crate updates or deletes them.
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use shared::models::RequestEvent;
/// use std::time::Duration;
///
/// let started_at = Local.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
/// let event = RequestEvent::from_timing("GET", "/wait/3", started_at, Duration::from_millis(3400));
///
/// assert_eq!(event.latency_seconds, 3);
/// assert_eq!(event.day_of_week, "Monday");
/// assert_eq!(event.hour_of_day, 14);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RequestEvent {
    /// The request path as observed (without query string).
    #[validate(length(min = 1, message = "URL cannot be empty"))]
    pub url: String,

    /// The HTTP verb.
    #[validate(length(min = 1, message = "Method cannot be empty"))]
    pub method: String,

    /// Elapsed wall-clock time, truncated to whole seconds.
    pub latency_seconds: u64,

    /// Weekday the request started on, e.g. "Monday".
    pub day_of_week: String,

    /// Hour of day the request started in, 0-23.
    #[validate(range(max = 23, message = "Hour must be between 0 and 23"))]
    pub hour_of_day: u8,
}

/// Errors that can occur during request event validation.
#[derive(Debug, Error)]
pub enum EventValidationError {
    /// The url is empty.
    #[error("Event URL cannot be empty")]
    EmptyUrl,

    /// The method is empty.
    #[error("Event method cannot be empty")]
    EmptyMethod,

    /// The day name is not a full English weekday name.
    #[error("Invalid day of week: '{0}'")]
    InvalidDay(String),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl RequestEvent {
    /// Creates an event from explicit field values.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        latency_seconds: u64,
        day_of_week: impl Into<String>,
        hour_of_day: u8,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            latency_seconds,
            day_of_week: day_of_week.into(),
            hour_of_day,
        }
    }

    /// Builds an event from a request's start time and elapsed duration.
    ///
    /// Sub-second precision is dropped: a request that took 0.9s is recorded
    /// with a latency of 0. Day and hour come from `started_at` in the time
    /// zone it carries.
    #[must_use]
    pub fn from_timing<Tz: TimeZone>(
        method: impl Into<String>,
        url: impl Into<String>,
        started_at: DateTime<Tz>,
        elapsed: Duration,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let hour = started_at.hour() as u8;
        Self::new(
            method,
            url,
            elapsed.as_secs(),
            weekday_name(started_at.weekday()),
            hour,
        )
    }

    /// Validates the event.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The url or method is empty
    /// - The hour is outside 0-23
    /// - The day is not a full English weekday name
    pub fn validate_event(&self) -> Result<(), EventValidationError> {
        if self.url.is_empty() {
            return Err(EventValidationError::EmptyUrl);
        }
        if self.method.is_empty() {
            return Err(EventValidationError::EmptyMethod);
        }
        if !WEEKDAY_NAMES.contains(&self.day_of_week.as_str()) {
            return Err(EventValidationError::InvalidDay(self.day_of_week.clone()));
        }

        self.validate()?;
        Ok(())
    }
}
