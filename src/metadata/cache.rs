//! Cache of active queue metadata.
//!
//! A reader that misses takes a [`ticket`](MetadataCache::ticket) before
//! querying the repository and hands it back to
//! [`fill`](MetadataCache::fill). Any invalidation in between bumps the
//! generation, and the fill is discarded, so an entry read before a delete
//! can never outlive that delete.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::domain::{QueueId, QueueMetadata};

#[derive(Default)]
pub struct MetadataCache {
    entries: DashMap<QueueId, QueueMetadata>,
    generation: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, queue_id: &QueueId) -> Option<QueueMetadata> {
        self.entries.get(queue_id).map(|entry| entry.value().clone())
    }

    pub fn ticket(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Insert `metadata` unless an invalidation happened since `ticket` was
    /// taken. Returns whether the entry was kept.
    pub fn fill(&self, ticket: u64, metadata: QueueMetadata) -> bool {
        if self.ticket() != ticket {
            return false;
        }
        let queue_id = metadata.queue_id.clone();
        self.entries.insert(queue_id.clone(), metadata);

        // An invalidation may have raced the insert.
        if self.ticket() != ticket {
            self.entries.remove(&queue_id);
            return false;
        }
        true
    }

    pub fn invalidate(&self, queue_id: &QueueId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(queue_id);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendType, QueueState, QueueType, ResourceId};

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
    fn test_fill_and_get() {
        let cache = MetadataCache::new();
        let ticket = cache.ticket();
        assert!(cache.fill(ticket, metadata("orders")));
        assert_eq!(cache.get(&QueueId::new("orders")), Some(metadata("orders")));
    }

    #[test]
    fn test_fill_after_invalidation_is_discarded() {
        let cache = MetadataCache::new();
        let ticket = cache.ticket();

        cache.invalidate(&QueueId::new("orders"));

        assert!(!cache.fill(ticket, metadata("orders")));
        assert!(cache.get(&QueueId::new("orders")).is_none());
    }

    #[test]
    fn test_clear_discards_pending_fills() {
        let cache = MetadataCache::new();
        assert!(cache.fill(cache.ticket(), metadata("a")));
        let ticket = cache.ticket();

        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.fill(ticket, metadata("b")));
        assert_eq!(cache.len(), 0);
    }
}
