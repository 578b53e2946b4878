// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::telemetry;

// Domain layer
pub mod domain;

// Broker core
pub mod backends;
pub mod metadata;
pub mod notify;
pub mod poll;
pub mod service;

// Application layer
pub mod api;
pub mod server;
