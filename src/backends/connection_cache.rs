//! Per-resource cache of live backends.
//!
//! An entry is reused only while the verify key derived from the resource's
//! current connection options matches the key it was created with. A changed
//! key replaces the entry; the stale backend is released once its last user
//! drops it. Connection attempts are serialised per resource, so a slow
//! resource never holds up the others.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::{ResourceId, Result};
use crate::infrastructure::metrics::BACKEND_CONNECTIONS_TOTAL;

use super::Backend;

struct CachedBackend {
    backend: Arc<dyn Backend>,
    verify_key: String,
}

#[derive(Default)]
pub struct ConnectionCache {
    entries: DashMap<ResourceId, CachedBackend>,
    connecting: DashMap<ResourceId, Arc<Mutex<()>>>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, resource_id: &ResourceId, verify_key: &str) -> Option<Arc<dyn Backend>> {
        self.entries
            .get(resource_id)
            .filter(|cached| cached.verify_key == verify_key)
            .map(|cached| cached.backend.clone())
    }

    /// Return the cached backend for `resource_id`, or establish one with
    /// `connect` when there is none or its verify key differs.
    pub async fn get_or_connect<F, Fut>(
        &self,
        resource_id: &ResourceId,
        verify_key: String,
        connect: F,
    ) -> Result<Arc<dyn Backend>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Backend>>>,
    {
        if let Some(backend) = self.lookup(resource_id, &verify_key) {
            return Ok(backend);
        }

        let lock = self.connecting.entry(resource_id.clone()).or_default().clone();
        let _guard = lock.lock().await;
        if let Some(backend) = self.lookup(resource_id, &verify_key) {
            return Ok(backend);
        }

        let backend = connect().await?;
        BACKEND_CONNECTIONS_TOTAL.inc();

        let previous = self.entries.insert(
            resource_id.clone(),
            CachedBackend {
                backend: backend.clone(),
                verify_key,
            },
        );
        if previous.is_some() {
            tracing::info!(resource_id = %resource_id, "Connection options changed, replaced backend");
        } else {
            tracing::info!(resource_id = %resource_id, "Backend connected");
        }

        Ok(backend)
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::backends::memory::MemoryBackend;

    fn memory() -> Arc<dyn Backend> {
        Arc::new(MemoryBackend::new())
    }

    #[tokio::test]
    async fn test_reuses_backend_until_key_changes() {
        let cache = ConnectionCache::new();
        let id = ResourceId::new("main");

        let first = cache
            .get_or_connect(&id, "a".into(), || async { Ok(memory()) })
            .await
            .unwrap();
        let again = cache
            .get_or_connect(&id, "a".into(), || async { Ok(memory()) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let changed = cache
            .get_or_connect(&id, "b".into(), || async { Ok(memory()) })
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &changed));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_connections_connect_once() {
        let cache = Arc::new(ConnectionCache::new());
        let connects = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let connects = connects.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_connect(&ResourceId::new("main"), "a".into(), || async move {
                            connects.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok(memory())
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_connect_does_not_block_other_resources() {
        let cache = Arc::new(ConnectionCache::new());

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_connect(&ResourceId::new("slow"), "a".into(), || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(memory())
                    })
                    .await
            })
        };
        // Let the slow connect take its lock.
        tokio::task::yield_now().await;

        let started = Instant::now();
        cache
            .get_or_connect(&ResourceId::new("fast"), "a".into(), || async { Ok(memory()) })
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(!slow.is_finished());

        slow.await.unwrap().unwrap();
        assert_eq!(cache.len(), 2);
    }
}
