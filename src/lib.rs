//! # coalesce-rs
//!
//! Keyed debounce buffer for inbound chat messages.
//!
//! Submissions are grouped by key (one conversation per key). Once a key
//! has been quiet for the configured gap, everything it buffered is handed
//! to a consumer as one space-joined payload. Includes webhook routing,
//! a dashboard delivery consumer, and OpenTelemetry observability.

pub mod config;
pub mod engine;
pub mod error;
pub mod forward;
pub mod ingest;
pub mod model;
pub mod telemetry;
