//! Storage backends.
//!
//! Resolution chain for one request:
//! [`ConnectorRegistry`] → [`Connector`] (per backend type, caches live
//! [`Backend`]s per resource) → [`QueueManager`] (per queue type) →
//! [`Queue`] (one physical queue).

pub mod connection_cache;
pub mod memory;
pub mod options;
pub mod postgres;
mod registry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    EnqueueMessageRequest, Message, MessageId, PollRequest, QueueMetadata, QueueType,
    RegisterQueueRequest, ResourceConnOptions, ResourceId, Result,
};

pub use connection_cache::ConnectionCache;
pub use registry::{ConnectorRegistry, ConnectorRegistryBuilder};

/// Produces live backends for resources of one backend type.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Return the backend for `resource_id`, reusing a cached one while
    /// `conn_options` are unchanged.
    async fn connect(
        &self,
        resource_id: &ResourceId,
        conn_options: &ResourceConnOptions,
    ) -> Result<Arc<dyn Backend>>;
}

/// A live connection to one resource.
pub trait Backend: Send + Sync {
    /// `UnknownQueueType` when this backend does not implement `queue_type`.
    fn queue_manager(&self, queue_type: &QueueType) -> Result<Arc<dyn QueueManager>>;
}

/// Lifecycle of physical queues of one queue type.
#[async_trait]
pub trait QueueManager: Send + Sync {
    /// Provision storage. `StorageObjectExists` if it is already there.
    async fn create_queue(&self, request: &RegisterQueueRequest) -> Result<()>;

    /// Bind to existing storage. Never provisions.
    async fn connect_to_queue(&self, metadata: &QueueMetadata) -> Result<Box<dyn Queue>>;

    /// Drop the storage.
    async fn delete_queue(&self, metadata: &QueueMetadata) -> Result<()>;
}

/// A physical queue with visibility-timeout delivery.
#[async_trait]
pub trait Queue: Send + Sync {
    async fn add(&self, request: &EnqueueMessageRequest) -> Result<MessageId>;

    /// Claim up to `request.limit` visible messages.
    async fn poll(&self, request: &PollRequest) -> Result<Vec<Message>>;

    /// Delete the message claimed under `ack_key`.
    async fn ack(&self, ack_key: &str) -> Result<()>;
}
