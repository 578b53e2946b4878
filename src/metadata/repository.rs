use async_trait::async_trait;

use crate::domain::{
    QueueId, QueueMetadata, QueueState, RegisterQueueRequest, ResourceMetadata, Result,
};

/// Durable storage of queue and resource configuration rows.
///
/// Implementations only persist. Caching and change events live in
/// [`MetadataStore`](super::MetadataStore).
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Insert a queue row in state `inactive`.
    ///
    /// `DuplicateQueue` if the id is taken, `ResourceNotFound` if the
    /// referenced resource does not exist.
    async fn insert_queue(&self, request: &RegisterQueueRequest) -> Result<()>;

    /// `QueueNotFound` if no row matched.
    async fn update_queue_state(&self, queue_id: &QueueId, state: QueueState) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete_queue(&self, queue_id: &QueueId) -> Result<bool>;

    /// The queue row joined with its resource's connection options.
    async fn find_queue(&self, queue_id: &QueueId) -> Result<Option<QueueMetadata>>;

    /// `DuplicateResource` if the id is taken.
    async fn insert_resource(&self, resource: &ResourceMetadata) -> Result<()>;
}
