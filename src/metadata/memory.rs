use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    BrokerError, QueueId, QueueMetadata, QueueState, RegisterQueueRequest, ResourceConnOptions,
    ResourceId, ResourceMetadata, Result,
};

use super::MetadataRepository;

#[derive(Default)]
struct Tables {
    queues: HashMap<QueueId, QueueRow>,
    resources: HashMap<ResourceId, ResourceConnOptions>,
}

struct QueueRow {
    request: RegisterQueueRequest,
    state: QueueState,
}

/// Process-local metadata rows. Shared between store instances through an
/// `Arc` to model several broker nodes over one database.
#[derive(Default)]
pub struct MemoryMetadataRepository {
    tables: RwLock<Tables>,
}

impl MemoryMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataRepository for MemoryMetadataRepository {
    async fn insert_queue(&self, request: &RegisterQueueRequest) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.queues.contains_key(&request.queue_id) {
            return Err(BrokerError::DuplicateQueue(request.queue_id.clone()));
        }
        if !tables.resources.contains_key(&request.resource_id) {
            return Err(BrokerError::ResourceNotFound(request.resource_id.clone()));
        }
        tables.queues.insert(
            request.queue_id.clone(),
            QueueRow {
                request: request.clone(),
                state: QueueState::Inactive,
            },
        );
        Ok(())
    }

    async fn update_queue_state(&self, queue_id: &QueueId, state: QueueState) -> Result<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .queues
            .get_mut(queue_id)
            .ok_or_else(|| BrokerError::QueueNotFound(queue_id.clone()))?;
        row.state = state;
        Ok(())
    }

    async fn delete_queue(&self, queue_id: &QueueId) -> Result<bool> {
        Ok(self.tables.write().await.queues.remove(queue_id).is_some())
    }

    async fn find_queue(&self, queue_id: &QueueId) -> Result<Option<QueueMetadata>> {
        let tables = self.tables.read().await;
        let Some(row) = tables.queues.get(queue_id) else {
            return Ok(None);
        };
        let conn_options = tables
            .resources
            .get(&row.request.resource_id)
            .cloned()
            .unwrap_or_default();

        Ok(Some(QueueMetadata {
            queue_id: row.request.queue_id.clone(),
            resource_id: row.request.resource_id.clone(),
            backend_type: row.request.backend_type.clone(),
            queue_type: row.request.queue_type.clone(),
            queue_state: row.state,
            options: row.request.options.clone(),
            conn_options,
        }))
    }

    async fn insert_resource(&self, resource: &ResourceMetadata) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.resources.contains_key(&resource.resource_id) {
            return Err(BrokerError::DuplicateResource(resource.resource_id.clone()));
        }
        tables
            .resources
            .insert(resource.resource_id.clone(), resource.conn_options.clone());
        Ok(())
    }
}
