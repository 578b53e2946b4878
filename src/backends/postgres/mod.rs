//! PostgreSQL backend.
//!
//! Every queue lives in its own table in the `queues` schema of the
//! resource's database.

mod backend;
mod connector;
mod delay_queue;

pub use backend::PostgresBackend;
pub use connector::{PostgresConnector, ResourcePoolConfig};
pub use delay_queue::{PostgresDelayQueue, PostgresDelayQueueManager};
