use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::options::{decode, UriConnOptions};
use crate::backends::{Backend, ConnectionCache, Connector};
use crate::domain::{ResourceConnOptions, ResourceId, Result};

use super::MemoryBackend;

#[derive(Default)]
pub struct MemoryConnector {
    cache: ConnectionCache,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        resource_id: &ResourceId,
        conn_options: &ResourceConnOptions,
    ) -> Result<Arc<dyn Backend>> {
        // The uri only tells configurations apart.
        let options: UriConnOptions = decode(conn_options)?;

        self.cache
            .get_or_connect(resource_id, options.uri, || async {
                Ok(Arc::new(MemoryBackend::new()) as Arc<dyn Backend>)
            })
            .await
    }
}
