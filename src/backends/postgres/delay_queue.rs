//! `simple-delay` queues on PostgreSQL.
//!
//! Table structure (`queues.<table>`):
//! - `message_id` - `BIGSERIAL` primary key, the public message id
//! - `created_at`, `scheduled_at` - enqueue time and first due time
//! - `visible_at` - indexed; a row is claimable once this has passed
//! - `ack_token` - token of the latest claim
//! - `attempts` - number of claims so far
//! - `data` - opaque payload

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::backends::options::{decode, DelayQueueOptions};
use crate::backends::{Queue, QueueManager};
use crate::domain::error::{codes, sqlstate};
use crate::domain::{
    AckKey, BrokerError, EnqueueMessageRequest, Message, MessageId, PollRequest, QueueId,
    QueueMetadata, QueueOptions, RegisterQueueRequest, Result,
};

type ClaimedRow = (i64, DateTime<Utc>, DateTime<Utc>, String, String);

fn table_name(queue_id: &QueueId, options: &QueueOptions) -> Result<String> {
    decode::<DelayQueueOptions>(options)?.table_name(queue_id)
}

fn map_ddl_error(table: &str, e: sqlx::Error) -> BrokerError {
    match sqlstate(&e).as_deref() {
        Some(codes::DUPLICATE_TABLE) => BrokerError::StorageObjectExists(format!("queues.{table}")),
        _ => BrokerError::Storage(e),
    }
}

pub struct PostgresDelayQueueManager {
    pool: PgPool,
}

impl PostgresDelayQueueManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueManager for PostgresDelayQueueManager {
    async fn create_queue(&self, request: &RegisterQueueRequest) -> Result<()> {
        let table = table_name(&request.queue_id, &request.options)?;

        let create_table = format!(
            r#"
            CREATE TABLE queues.{table} (
                message_id BIGSERIAL PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                scheduled_at TIMESTAMPTZ NOT NULL,
                visible_at TIMESTAMPTZ NOT NULL,
                ack_token VARCHAR(32),
                attempts INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL DEFAULT ''
            )
            "#
        );
        let create_index =
            format!("CREATE INDEX idx_{table}_visible_at ON queues.{table} (visible_at)");

        let mut tx = self.pool.begin().await?;
        sqlx::query("CREATE SCHEMA IF NOT EXISTS queues")
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create_table)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_ddl_error(&table, e))?;
        sqlx::query(&create_index)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_ddl_error(&table, e))?;
        tx.commit().await?;

        tracing::info!(queue_id = %request.queue_id, table = %table, "Queue table created");
        Ok(())
    }

    async fn connect_to_queue(&self, metadata: &QueueMetadata) -> Result<Box<dyn Queue>> {
        let table = table_name(&metadata.queue_id, &metadata.options)?;
        Ok(Box::new(PostgresDelayQueue::new(self.pool.clone(), &table)))
    }

    async fn delete_queue(&self, metadata: &QueueMetadata) -> Result<()> {
        let table = table_name(&metadata.queue_id, &metadata.options)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS queues.{table}"))
            .execute(&self.pool)
            .await?;

        tracing::info!(queue_id = %metadata.queue_id, table = %table, "Queue table dropped");
        Ok(())
    }
}

/// Handle to one queue table. Statements are rendered once, the table name
/// having been validated against the table name pattern.
pub struct PostgresDelayQueue {
    pool: PgPool,
    insert_sql: String,
    claim_sql: String,
    ack_sql: String,
}

impl PostgresDelayQueue {
    fn new(pool: PgPool, table: &str) -> Self {
        let insert_sql = format!(
            r#"
            INSERT INTO queues.{table} (data, scheduled_at, visible_at)
            VALUES ($1, NOW() + make_interval(secs => $2), NOW() + make_interval(secs => $2))
            RETURNING message_id
            "#
        );

        // Single statement: the selection locks and skips rows held by
        // concurrent claims, the update hides and re-tokens them.
        let claim_sql = format!(
            r#"
            UPDATE queues.{table} AS original
            SET visible_at = NOW() + make_interval(secs => $2),
                attempts = original.attempts + 1,
                ack_token = substring(md5(random()::text) from 1 for 7)
            FROM (
                SELECT message_id
                FROM queues.{table}
                WHERE visible_at <= NOW()
                ORDER BY visible_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            ) AS claimed
            WHERE original.message_id = claimed.message_id
            RETURNING original.message_id, original.created_at, original.scheduled_at,
                      original.data, original.ack_token
            "#
        );

        let ack_sql =
            format!("DELETE FROM queues.{table} WHERE message_id = $1 AND ack_token = $2");

        Self {
            pool,
            insert_sql,
            claim_sql,
            ack_sql,
        }
    }

    async fn claim(&self, request: &PollRequest) -> std::result::Result<Vec<ClaimedRow>, sqlx::Error> {
        let timeout_ms = request.remaining().as_millis().max(1);

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(timeout_ms.to_string())
            .execute(&mut *tx)
            .await?;
        let rows: Vec<ClaimedRow> = sqlx::query_as(&self.claim_sql)
            .bind(request.limit as i64)
            .bind(request.visibility.as_secs_f64())
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(rows)
    }
}

#[async_trait]
impl Queue for PostgresDelayQueue {
    async fn add(&self, request: &EnqueueMessageRequest) -> Result<MessageId> {
        let (id,): (i64,) = sqlx::query_as(&self.insert_sql)
            .bind(&request.data)
            .bind(request.delay.duration().as_secs_f64())
            .fetch_one(&self.pool)
            .await?;
        Ok(MessageId::from_storage(id))
    }

    async fn poll(&self, request: &PollRequest) -> Result<Vec<Message>> {
        if request.remaining().is_zero() {
            return Err(BrokerError::DeadlineExceeded);
        }

        let rows = match tokio::time::timeout_at(request.deadline, self.claim(request)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) if sqlstate(&e).as_deref() == Some(codes::QUERY_CANCELED) => {
                return Err(BrokerError::DeadlineExceeded)
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(BrokerError::DeadlineExceeded),
        };

        Ok(rows
            .into_iter()
            .map(|(id, created_at, scheduled_at, data, token)| Message {
                id: MessageId::from_storage(id),
                created_at,
                scheduled_at,
                data,
                ack_key: AckKey::new(id, token).to_string(),
            })
            .collect())
    }

    async fn ack(&self, ack_key: &str) -> Result<()> {
        let key: AckKey = ack_key.parse()?;

        let result = sqlx::query(&self.ack_sql)
            .bind(key.message_id)
            .bind(&key.token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BrokerError::AckIneffective);
        }
        Ok(())
    }
}
