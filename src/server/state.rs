use std::sync::Arc;
use std::time::Instant;

use crate::backends::memory::MemoryConnector;
use crate::backends::postgres::{PostgresConnector, ResourcePoolConfig};
use crate::backends::ConnectorRegistry;
use crate::domain::BackendType;
use crate::infrastructure::config::Settings;
use crate::infrastructure::postgres::PostgresPool;
use crate::metadata::{
    MemoryMetadataRepository, MetadataRepository, MetadataStore, PostgresMetadataRepository,
};
use crate::notify::{create_notifier, Notifier};
use crate::service::{Service, ServiceConfig};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<Service>,
    pub notifier: Arc<dyn Notifier>,
    /// Absent when metadata lives in memory.
    pub metadata_pool: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        service: Arc<Service>,
        notifier: Arc<dyn Notifier>,
        metadata_pool: Option<PostgresPool>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            service,
            notifier,
            metadata_pool,
            start_time: Instant::now(),
        }
    }

    /// Connect the metadata database and notifier, then wire the service.
    pub async fn connect(settings: Settings) -> anyhow::Result<Self> {
        let (repository, metadata_pool): (Arc<dyn MetadataRepository>, Option<PostgresPool>) =
            match settings.metadata.backend.as_str() {
                "postgres" => {
                    let pool = PostgresPool::new(&settings.metadata).await?;
                    let repository = PostgresMetadataRepository::new(pool.pool().clone());
                    if settings.metadata.run_migrations {
                        repository.migrate().await?;
                    }
                    (Arc::new(repository) as Arc<dyn MetadataRepository>, Some(pool))
                }
                "memory" => {
                    tracing::warn!("Metadata kept in memory, queues are lost on restart");
                    (Arc::new(MemoryMetadataRepository::new()) as Arc<dyn MetadataRepository>, None)
                }
                other => anyhow::bail!("unknown metadata backend {other:?}"),
            };

        let notifier =
            create_notifier(&settings.notify, metadata_pool.as_ref().map(PostgresPool::pool))
                .await?;
        let metadata = Arc::new(MetadataStore::new(repository, notifier.clone()));

        let service = Service::new(
            metadata,
            Arc::new(connector_registry(&settings)),
            service_config(&settings),
        );

        Ok(Self::new(settings, Arc::new(service), notifier, metadata_pool))
    }
}

pub fn connector_registry(settings: &Settings) -> ConnectorRegistry {
    let pool_config = ResourcePoolConfig {
        max_connections: settings.resources.max_connections,
        acquire_timeout: settings.resources.acquire_timeout(),
        idle_timeout: settings.resources.idle_timeout(),
    };

    ConnectorRegistry::builder()
        .register_connector(BackendType::POSTGRES, Arc::new(PostgresConnector::new(pool_config)))
        .register_connector(BackendType::MEMORY, Arc::new(MemoryConnector::new()))
        .build()
}

pub fn service_config(settings: &Settings) -> ServiceConfig {
    ServiceConfig {
        max_poll_limit: settings.poll.max_limit,
        max_poll_timeout: settings.poll.max_timeout(),
        max_visibility: settings.poll.max_visibility(),
        poll_backoff_max: settings.poll.backoff_max(),
    }
}
