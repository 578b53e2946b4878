//! PostgreSQL persistence module.
//!
//! Provides the connection pool for the metadata database.

pub mod pool;

pub use pool::{PoolStats, PostgresPool, PostgresPoolError};
