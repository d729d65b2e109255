//! Command-line client for the task service.
//!
//! - `api` - HTTP access to the service
//! - `cache` - local fallback copy of the task list
//! - `view` - filtered views and counters
//! - `controller` - service-first operations with cache fallback

pub mod api;
pub mod cache;
pub mod controller;
pub mod view;

pub use api::{ApiError, HealthReport, HttpTaskApi, StoreStatus, TaskApi};
pub use cache::{LocalCache, TASKS_KEY};
pub use controller::{Connectivity, Controller, Outcome};
pub use view::{Filter, Source, View};
