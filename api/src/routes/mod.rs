//! API route definitions.
//!
//! This module organizes all HTTP routes for the Routepulse API server.

mod analytics;
mod health;
mod wait;

pub use analytics::{analytics_routes, AnalyticsErrorResponse, ANALYTICS_ERROR_MESSAGE};
pub use health::health_routes;
pub use wait::wait_routes;
