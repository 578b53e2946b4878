//! PostgreSQL metadata repository.
//!
//! Tables:
//! - `barnacle.resource_configs` - one row per resource, connection options as JSONB
//! - `barnacle.queue_configs` - one row per queue, referencing its resource

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::error::{codes, sqlstate};
use crate::domain::{
    BrokerError, QueueId, QueueMetadata, QueueOptions, QueueState, RegisterQueueRequest,
    ResourceConnOptions, ResourceMetadata, Result,
};

use super::MetadataRepository;

const SCHEMA: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS barnacle",
    r#"CREATE TABLE IF NOT EXISTS barnacle.resource_configs (
        resource_id TEXT PRIMARY KEY,
        config JSONB NOT NULL DEFAULT '{}'::jsonb
    )"#,
    r#"CREATE TABLE IF NOT EXISTS barnacle.queue_configs (
        queue_id TEXT PRIMARY KEY,
        resource_id TEXT NOT NULL REFERENCES barnacle.resource_configs (resource_id),
        backend_type TEXT NOT NULL,
        queue_type TEXT NOT NULL,
        config JSONB NOT NULL DEFAULT '{}'::jsonb,
        queue_state TEXT NOT NULL DEFAULT 'inactive'
    )"#,
];

type QueueRow = (
    String,
    String,
    String,
    String,
    String,
    Json<QueueOptions>,
    Json<ResourceConnOptions>,
);

pub struct PostgresMetadataRepository {
    pool: PgPool,
}

impl PostgresMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the metadata schema if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::info!("Metadata schema ready");
        Ok(())
    }
}

#[async_trait]
impl MetadataRepository for PostgresMetadataRepository {
    async fn insert_queue(&self, request: &RegisterQueueRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO barnacle.queue_configs
                (queue_id, resource_id, backend_type, queue_type, config, queue_state)
            VALUES ($1, $2, $3, $4, $5, 'inactive')
            "#,
        )
        .bind(request.queue_id.as_str())
        .bind(request.resource_id.as_str())
        .bind(request.backend_type.as_str())
        .bind(request.queue_type.as_str())
        .bind(Json(&request.options))
        .execute(&self.pool)
        .await
        .map_err(|e| match sqlstate(&e).as_deref() {
            Some(codes::UNIQUE_VIOLATION) => BrokerError::DuplicateQueue(request.queue_id.clone()),
            Some(codes::FOREIGN_KEY_VIOLATION) => {
                BrokerError::ResourceNotFound(request.resource_id.clone())
            }
            _ => BrokerError::Storage(e),
        })?;
        Ok(())
    }

    async fn update_queue_state(&self, queue_id: &QueueId, state: QueueState) -> Result<()> {
        let result = sqlx::query("UPDATE barnacle.queue_configs SET queue_state = $1 WHERE queue_id = $2")
            .bind(state.as_str())
            .bind(queue_id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BrokerError::QueueNotFound(queue_id.clone()));
        }
        Ok(())
    }

    async fn delete_queue(&self, queue_id: &QueueId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM barnacle.queue_configs WHERE queue_id = $1")
            .bind(queue_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_queue(&self, queue_id: &QueueId) -> Result<Option<QueueMetadata>> {
        let row: Option<QueueRow> = sqlx::query_as(
            r#"
            SELECT qc.queue_id, qc.resource_id, qc.backend_type, qc.queue_type,
                   qc.queue_state, qc.config, rc.config
            FROM barnacle.queue_configs AS qc
            JOIN barnacle.resource_configs AS rc USING (resource_id)
            WHERE qc.queue_id = $1
            "#,
        )
        .bind(queue_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((queue_id, resource_id, backend_type, queue_type, state, options, conn_options)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(QueueMetadata {
            queue_id: queue_id.into(),
            resource_id: resource_id.into(),
            backend_type: backend_type.into(),
            queue_type: queue_type.into(),
            queue_state: state.parse()?,
            options: options.0,
            conn_options: conn_options.0,
        }))
    }

    async fn insert_resource(&self, resource: &ResourceMetadata) -> Result<()> {
        sqlx::query("INSERT INTO barnacle.resource_configs (resource_id, config) VALUES ($1, $2)")
            .bind(resource.resource_id.as_str())
            .bind(Json(&resource.conn_options))
            .execute(&self.pool)
            .await
            .map_err(|e| match sqlstate(&e).as_deref() {
                Some(codes::UNIQUE_VIOLATION) => {
                    BrokerError::DuplicateResource(resource.resource_id.clone())
                }
                _ => BrokerError::Storage(e),
            })?;
        Ok(())
    }
}
