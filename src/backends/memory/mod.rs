//! In-process backend.
//!
//! Each connected resource owns its own set of tables, so a resource whose
//! connection options change starts from an empty store, the same way a
//! Postgres resource pointed at another database would.

mod backend;
mod connector;
mod delay_queue;

pub use backend::MemoryBackend;
pub use connector::MemoryConnector;
pub use delay_queue::{MemoryDelayQueue, MemoryDelayQueueManager};
