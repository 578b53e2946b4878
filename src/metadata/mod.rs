//! Queue and resource metadata.
//!
//! - `repository`: durable rows (`postgres`, `memory`)
//! - `store`: the cached, event-publishing [`MetadataStorage`] implementation
//! - `cache`, `events`: the local cache and the invalidation wire format

mod cache;
mod events;
mod memory;
mod postgres;
mod repository;
mod store;

use async_trait::async_trait;

use crate::domain::{QueueId, QueueMetadata, QueueState, RegisterQueueRequest, ResourceMetadata, Result};

pub use cache::MetadataCache;
pub use events::{EventType, QueueEvent};
pub use memory::MemoryMetadataRepository;
pub use postgres::PostgresMetadataRepository;
pub use repository::MetadataRepository;
pub use store::MetadataStore;

/// Queue and resource configuration as seen by the broker.
#[async_trait]
pub trait MetadataStorage: Send + Sync {
    /// Register a queue in state `inactive`.
    async fn register_queue_metadata(&self, request: &RegisterQueueRequest) -> Result<()>;

    async fn set_queue_state(&self, queue_id: &QueueId, state: QueueState) -> Result<()>;

    /// Remove the queue row. Succeeds even when the row does not exist.
    async fn delete_queue_metadata(&self, queue_id: &QueueId) -> Result<()>;

    /// Fetch a queue whose state is one of `allowed_states` (empty: any).
    /// Fails with `QueueNotFound` otherwise.
    async fn get_queue_metadata(
        &self,
        queue_id: &QueueId,
        allowed_states: &[QueueState],
    ) -> Result<QueueMetadata>;

    async fn register_resource(&self, resource: &ResourceMetadata) -> Result<()>;
}
