use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;

use crate::backends::options::{decode, UriConnOptions};
use crate::backends::{Backend, ConnectionCache, Connector};
use crate::domain::{BrokerError, ResourceConnOptions, ResourceId, Result};

use super::PostgresBackend;

/// Pool sizing applied to every resource connection.
#[derive(Debug, Clone)]
pub struct ResourcePoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ResourcePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Connects to resources whose options are `{"uri": "postgres://..."}`.
/// The uri is the verify key.
pub struct PostgresConnector {
    pool_config: ResourcePoolConfig,
    cache: ConnectionCache,
}

impl PostgresConnector {
    pub fn new(pool_config: ResourcePoolConfig) -> Self {
        Self {
            pool_config,
            cache: ConnectionCache::new(),
        }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(
        &self,
        resource_id: &ResourceId,
        conn_options: &ResourceConnOptions,
    ) -> Result<Arc<dyn Backend>> {
        let options: UriConnOptions = decode(conn_options)?;
        let config = self.pool_config.clone();
        let uri = options.uri.clone();

        self.cache
            .get_or_connect(resource_id, options.uri, || async move {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.acquire_timeout)
                    .idle_timeout(config.idle_timeout)
                    .connect(&uri)
                    .await?;

                tracing::info!(
                    pool_size = config.max_connections,
                    "Resource connection pool created"
                );
                Ok::<Arc<dyn Backend>, BrokerError>(Arc::new(PostgresBackend::new(pool)))
            })
            .await
    }
}
