use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::backends::options::{decode, DelayQueueOptions};
use crate::backends::{Queue, QueueManager};
use crate::domain::ack_key::random_token;
use crate::domain::{
    AckKey, BrokerError, EnqueueMessageRequest, Message, MessageId, PollRequest, QueueId,
    QueueMetadata, QueueOptions, RegisterQueueRequest, Result,
};

use super::backend::Tables;

struct StoredMessage {
    created_at: DateTime<Utc>,
    scheduled_at: DateTime<Utc>,
    visible_at: Instant,
    ack_token: Option<String>,
    attempts: u32,
    data: String,
}

/// One provisioned queue: rows keyed by their monotonically increasing id.
#[derive(Default)]
pub struct MemoryTable {
    last_id: i64,
    messages: BTreeMap<i64, StoredMessage>,
}

fn table_name(queue_id: &QueueId, options: &QueueOptions) -> Result<String> {
    decode::<DelayQueueOptions>(options)?.table_name(queue_id)
}

pub struct MemoryDelayQueueManager {
    tables: Tables,
}

impl MemoryDelayQueueManager {
    pub(super) fn new(tables: Tables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl QueueManager for MemoryDelayQueueManager {
    async fn create_queue(&self, request: &RegisterQueueRequest) -> Result<()> {
        let table = table_name(&request.queue_id, &request.options)?;

        let mut tables = self.tables.lock().await;
        if tables.contains_key(&table) {
            return Err(BrokerError::StorageObjectExists(format!("queues.{table}")));
        }
        tables.insert(table.clone(), MemoryTable::default());

        tracing::info!(queue_id = %request.queue_id, table = %table, "Memory queue created");
        Ok(())
    }

    async fn connect_to_queue(&self, metadata: &QueueMetadata) -> Result<Box<dyn Queue>> {
        Ok(Box::new(MemoryDelayQueue {
            tables: self.tables.clone(),
            queue_id: metadata.queue_id.clone(),
            table: table_name(&metadata.queue_id, &metadata.options)?,
        }))
    }

    async fn delete_queue(&self, metadata: &QueueMetadata) -> Result<()> {
        let table = table_name(&metadata.queue_id, &metadata.options)?;
        if self.tables.lock().await.remove(&table).is_some() {
            tracing::info!(queue_id = %metadata.queue_id, table = %table, "Memory queue dropped");
        }
        Ok(())
    }
}

pub struct MemoryDelayQueue {
    tables: Tables,
    queue_id: QueueId,
    table: String,
}

impl MemoryDelayQueue {
    fn missing(&self) -> BrokerError {
        BrokerError::QueueNotFound(self.queue_id.clone())
    }
}

#[async_trait]
impl Queue for MemoryDelayQueue {
    async fn add(&self, request: &EnqueueMessageRequest) -> Result<MessageId> {
        let delay = request.delay.duration();
        let now = Utc::now();
        let scheduled_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| BrokerError::InvalidDelay(format!("{} is out of range", request.delay)))?;
        let visible_at = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| BrokerError::InvalidDelay(format!("{} is out of range", request.delay)))?;

        let mut tables = self.tables.lock().await;
        let table = tables.get_mut(&self.table).ok_or_else(|| self.missing())?;

        table.last_id += 1;
        let id = table.last_id;
        table.messages.insert(
            id,
            StoredMessage {
                created_at: now,
                scheduled_at,
                visible_at,
                ack_token: None,
                attempts: 0,
                data: request.data.clone(),
            },
        );

        Ok(MessageId::from_storage(id))
    }

    async fn poll(&self, request: &PollRequest) -> Result<Vec<Message>> {
        if Instant::now() >= request.deadline {
            return Err(BrokerError::DeadlineExceeded);
        }

        let mut tables = tokio::time::timeout_at(request.deadline, self.tables.lock())
            .await
            .map_err(|_| BrokerError::DeadlineExceeded)?;
        let table = tables.get_mut(&self.table).ok_or_else(|| self.missing())?;

        let now = Instant::now();
        let hidden_until = now.checked_add(request.visibility).ok_or_else(|| {
            BrokerError::Validation(format!(
                "visibility of {}s is out of range",
                request.visibility.as_secs()
            ))
        })?;
        let mut visible: Vec<(Instant, i64)> = table
            .messages
            .iter()
            .filter(|(_, m)| m.visible_at <= now)
            .map(|(id, m)| (m.visible_at, *id))
            .collect();
        visible.sort_unstable();
        visible.truncate(request.limit);

        let mut claimed = Vec::with_capacity(visible.len());
        for (_, id) in visible {
            let Some(message) = table.messages.get_mut(&id) else {
                continue;
            };
            let token = random_token();
            message.visible_at = hidden_until;
            message.attempts += 1;
            message.ack_token = Some(token.clone());
            tracing::trace!(message_id = id, attempts = message.attempts, "Message claimed");

            claimed.push(Message {
                id: MessageId::from_storage(id),
                created_at: message.created_at,
                scheduled_at: message.scheduled_at,
                data: message.data.clone(),
                ack_key: AckKey::new(id, token).to_string(),
            });
        }

        Ok(claimed)
    }

    async fn ack(&self, ack_key: &str) -> Result<()> {
        let key: AckKey = ack_key.parse()?;

        let mut tables = self.tables.lock().await;
        let table = tables.get_mut(&self.table).ok_or_else(|| self.missing())?;

        match table.messages.get(&key.message_id) {
            Some(message) if message.ack_token.as_deref() == Some(key.token.as_str()) => {
                table.messages.remove(&key.message_id);
                Ok(())
            }
            _ => Err(BrokerError::AckIneffective),
        }
    }
}
