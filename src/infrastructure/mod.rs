//! Infrastructure layer modules
//!
//! Shared components used by the broker and the HTTP surface:
//! - `backoff`: exponential backoff with jitter for reconnect loops
//! - `config`: application settings
//! - `error`: HTTP error responses
//! - `metrics`: Prometheus registry and helpers
//! - `postgres`: metadata database pool
//! - `telemetry`: tracing subscriber and OpenTelemetry export

pub mod backoff;
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod telemetry;
