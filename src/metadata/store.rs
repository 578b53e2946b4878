use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::domain::{
    BrokerError, QueueId, QueueMetadata, QueueState, RegisterQueueRequest, ResourceMetadata, Result,
};
use crate::infrastructure::metrics::{METADATA_CACHE_HITS, METADATA_CACHE_MISSES};
use crate::notify::{Notification, Notifier};

use super::cache::MetadataCache;
use super::events::{EventType, QueueEvent};
use super::{MetadataRepository, MetadataStorage};

/// Metadata storage with a local cache of active queues.
///
/// Mutations are published on the notifier. Every store, including the
/// publishing one, evicts its cached entry when it sees a `deleted` event
/// and drops the whole cache when the transport reports a gap.
pub struct MetadataStore {
    repository: Arc<dyn MetadataRepository>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<MetadataCache>,
    listener: JoinHandle<()>,
}

impl MetadataStore {
    pub fn new(repository: Arc<dyn MetadataRepository>, notifier: Arc<dyn Notifier>) -> Self {
        let cache = Arc::new(MetadataCache::new());
        let listener = tokio::spawn(apply_events(cache.clone(), notifier.subscribe()));

        Self {
            repository,
            notifier,
            cache,
            listener,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    async fn publish(&self, queue_id: &QueueId, event_type: EventType) {
        let event = QueueEvent::new(queue_id.clone(), event_type);
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, queue_id = %queue_id, "Failed to encode metadata event");
                return;
            }
        };

        if let Err(e) = self.notifier.publish(&payload).await {
            tracing::warn!(
                error = %e,
                queue_id = %queue_id,
                event = ?event_type,
                notifier = self.notifier.name(),
                "Failed to publish metadata event"
            );
        }
    }
}

impl Drop for MetadataStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl MetadataStorage for MetadataStore {
    async fn register_queue_metadata(&self, request: &RegisterQueueRequest) -> Result<()> {
        self.repository.insert_queue(request).await?;
        self.publish(&request.queue_id, EventType::Registered).await;
        Ok(())
    }

    async fn set_queue_state(&self, queue_id: &QueueId, state: QueueState) -> Result<()> {
        self.repository.update_queue_state(queue_id, state).await?;
        if state == QueueState::Active {
            self.publish(queue_id, EventType::Activated).await;
        }
        Ok(())
    }

    async fn delete_queue_metadata(&self, queue_id: &QueueId) -> Result<()> {
        let removed = self.repository.delete_queue(queue_id).await?;
        if !removed {
            tracing::debug!(queue_id = %queue_id, "No metadata row to delete");
        }

        self.cache.invalidate(queue_id);
        self.publish(queue_id, EventType::Deleted).await;
        Ok(())
    }

    async fn get_queue_metadata(
        &self,
        queue_id: &QueueId,
        allowed_states: &[QueueState],
    ) -> Result<QueueMetadata> {
        let cacheable = allowed_states == [QueueState::Active];
        if cacheable {
            if let Some(metadata) = self.cache.get(queue_id) {
                METADATA_CACHE_HITS.inc();
                return Ok(metadata);
            }
            METADATA_CACHE_MISSES.inc();
        }

        let ticket = self.cache.ticket();
        let metadata = self
            .repository
            .find_queue(queue_id)
            .await?
            .filter(|m| allowed_states.is_empty() || allowed_states.contains(&m.queue_state))
            .ok_or_else(|| BrokerError::QueueNotFound(queue_id.clone()))?;

        if cacheable {
            self.cache.fill(ticket, metadata.clone());
        }
        Ok(metadata)
    }

    async fn register_resource(&self, resource: &ResourceMetadata) -> Result<()> {
        resource.validate()?;
        self.repository.insert_resource(resource).await
    }
}

async fn apply_events(cache: Arc<MetadataCache>, mut rx: broadcast::Receiver<Notification>) {
    loop {
        match rx.recv().await {
            Ok(Notification::Payload(payload)) => apply_payload(&cache, &payload),
            Ok(Notification::Resync) => {
                tracing::info!(evicted = cache.len(), "Notifier reconnected, clearing metadata cache");
                cache.clear();
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Metadata events lagged, clearing metadata cache");
                cache.clear();
            }
            Err(RecvError::Closed) => {
                tracing::debug!("Metadata event stream closed");
                return;
            }
        }
    }
}

fn apply_payload(cache: &MetadataCache, payload: &str) {
    match serde_json::from_str::<QueueEvent>(payload) {
        Ok(QueueEvent {
            queue_id,
            event_type: EventType::Deleted,
        }) => {
            tracing::debug!(queue_id = %queue_id, "Evicting deleted queue from metadata cache");
            cache.invalidate(&queue_id);
        }
        // Entries are filled on read.
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, payload = %payload, "Ignoring malformed metadata event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendType, QueueType, ResourceId};
    use crate::metadata::MemoryMetadataRepository;
    use crate::notify::MemoryNotifier;
    use serde_json::json;

    fn metadata(id: &str) -> QueueMetadata {
        QueueMetadata {
            queue_id: QueueId::new(id),
            resource_id: ResourceId::new("main"),
            backend_type: BackendType::new(BackendType::MEMORY),
            queue_type: QueueType::simple_delay(),
            queue_state: QueueState::Active,
            options: Default::default(),
            conn_options: Default::default(),
        }
    }

    #[test]
    fn test_deleted_payload_evicts() {
        let cache = MetadataCache::new();
        cache.fill(cache.ticket(), metadata("orders"));

        apply_payload(&cache, r#"{"qid":"orders","type":"activated"}"#);
        assert!(cache.get(&QueueId::new("orders")).is_some());

        apply_payload(&cache, r#"{"qid":"orders","type":"deleted"}"#);
        assert!(cache.get(&QueueId::new("orders")).is_none());
    }

    #[test]
    fn test_malformed_payload_is_ignored() {
        let cache = MetadataCache::new();
        cache.fill(cache.ticket(), metadata("orders"));

        apply_payload(&cache, "not json");
        apply_payload(&cache, r#"{"qid":"orders"}"#);

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let notifier = MemoryNotifier::new();
        let mut rx = notifier.subscribe();
        let store = MetadataStore::new(
            Arc::new(MemoryMetadataRepository::new()),
            Arc::new(notifier.clone()),
        );

        let resource: ResourceMetadata =
            serde_json::from_value(json!({"id": "main", "options": {}})).unwrap();
        store.register_resource(&resource).await.unwrap();

        let request: RegisterQueueRequest = serde_json::from_value(json!({
            "id": "orders", "resource": "main", "backend": "memory", "type": "simple-delay"
        }))
        .unwrap();
        store.register_queue_metadata(&request).await.unwrap();
        store.set_queue_state(&request.queue_id, QueueState::Inactive).await.unwrap();
        store.set_queue_state(&request.queue_id, QueueState::Active).await.unwrap();
        store.delete_queue_metadata(&request.queue_id).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            match rx.recv().await.unwrap() {
                Notification::Payload(p) => seen.push(serde_json::from_str::<QueueEvent>(&p).unwrap().event_type),
                Notification::Resync => panic!("unexpected resync"),
            }
        }
        assert_eq!(seen, vec![EventType::Registered, EventType::Activated, EventType::Deleted]);
    }

    #[tokio::test]
    async fn test_register_resource_validates_id() {
        let store = MetadataStore::new(
            Arc::new(MemoryMetadataRepository::new()),
            Arc::new(MemoryNotifier::new()),
        );
        let resource = ResourceMetadata {
            resource_id: ResourceId::new("Main-DB"),
            conn_options: Default::default(),
        };
        assert!(matches!(
            store.register_resource(&resource).await,
            Err(BrokerError::ResourceIdInvalid(_))
        ));
    }
}
