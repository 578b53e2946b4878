//! Broker operations.
//!
//! The service resolves queue metadata, walks the backend chain for the
//! queue and delegates. Queue creation is two-phase: metadata is registered
//! `inactive`, storage is provisioned, and only then is the queue activated.
//! A failed provisioning removes the metadata again.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::backends::{ConnectorRegistry, Queue, QueueManager};
use crate::domain::{
    BrokerError, EnqueueMessageRequest, Message, MessageId, QueueId, QueueMetadata, QueueState,
    RegisterQueueRequest, ResourceMetadata, Result,
};
use crate::infrastructure::metrics::{MessageMetrics, QueueMetrics, POLL_DURATION_SECONDS};
use crate::metadata::MetadataStorage;
use crate::poll::{long_poll, LongPoll, LongPollError, StaticWaiter, Waiter};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound for `limit` in a poll.
    pub max_poll_limit: usize,
    /// Poll timeouts above this are clamped.
    pub max_poll_timeout: Duration,
    /// Longest visibility timeout a poll may ask for.
    pub max_visibility: Duration,
    /// Sleep cap between empty poll rounds.
    pub poll_backoff_max: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_poll_limit: 100,
            max_poll_timeout: Duration::from_secs(30),
            max_visibility: Duration::from_secs(12 * 3600),
            poll_backoff_max: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollQueueRequest {
    pub queue_id: QueueId,
    pub limit: usize,
    pub timeout: Duration,
    pub visibility: Duration,
}

pub struct Service {
    metadata: Arc<dyn MetadataStorage>,
    connectors: Arc<ConnectorRegistry>,
    waiter: Arc<dyn Waiter>,
    config: ServiceConfig,
}

impl Service {
    pub fn new(
        metadata: Arc<dyn MetadataStorage>,
        connectors: Arc<ConnectorRegistry>,
        config: ServiceConfig,
    ) -> Self {
        let waiter = Arc::new(StaticWaiter::new(config.poll_backoff_max));
        Self {
            metadata,
            connectors,
            waiter,
            config,
        }
    }

    /// Replace the default [`StaticWaiter`].
    pub fn with_waiter(mut self, waiter: Arc<dyn Waiter>) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    async fn queue_manager(&self, metadata: &QueueMetadata) -> Result<Arc<dyn QueueManager>> {
        let connector = self.connectors.connector(&metadata.backend_type)?;
        let backend = connector
            .connect(&metadata.resource_id, &metadata.conn_options)
            .await?;
        backend.queue_manager(&metadata.queue_type)
    }

    async fn active_queue(&self, queue_id: &QueueId) -> Result<Box<dyn Queue>> {
        let metadata = self
            .metadata
            .get_queue_metadata(queue_id, &[QueueState::Active])
            .await?;
        self.queue_manager(&metadata)
            .await?
            .connect_to_queue(&metadata)
            .await
    }

    async fn provision(&self, request: &RegisterQueueRequest) -> Result<()> {
        let metadata = self
            .metadata
            .get_queue_metadata(&request.queue_id, &[QueueState::Active, QueueState::Inactive])
            .await?;
        self.queue_manager(&metadata)
            .await?
            .create_queue(request)
            .await
    }

    #[tracing::instrument(
        name = "service.create_queue",
        skip(self, request),
        fields(queue_id = %request.queue_id, backend = %request.backend_type)
    )]
    pub async fn create_queue(&self, request: RegisterQueueRequest) -> Result<()> {
        request.validate()?;
        self.metadata.register_queue_metadata(&request).await?;

        if let Err(provisioning) = self.provision(&request).await {
            return Err(self.roll_back_registration(&request.queue_id, provisioning).await);
        }

        self.metadata
            .set_queue_state(&request.queue_id, QueueState::Active)
            .await?;

        QueueMetrics::record_created();
        tracing::info!(queue_id = %request.queue_id, "Queue created");
        Ok(())
    }

    /// Undo a registration whose provisioning failed. Returns the error the
    /// caller should see.
    async fn roll_back_registration(&self, queue_id: &QueueId, provisioning: BrokerError) -> BrokerError {
        match self.metadata.delete_queue_metadata(queue_id).await {
            Ok(()) => {
                QueueMetrics::record_provisioning_failure(true);
                tracing::warn!(
                    queue_id = %queue_id,
                    error = %provisioning,
                    "Queue provisioning failed, registration rolled back"
                );
                provisioning
            }
            Err(cleanup) => {
                QueueMetrics::record_provisioning_failure(false);
                tracing::error!(
                    queue_id = %queue_id,
                    provisioning_error = %provisioning,
                    cleanup_error = %cleanup,
                    "Queue provisioning failed and metadata could not be removed"
                );
                BrokerError::OrphanedMetadata {
                    queue_id: queue_id.clone(),
                    provisioning: Box::new(provisioning),
                    cleanup: Box::new(cleanup),
                }
            }
        }
    }

    /// Remove a queue in any state: metadata first, so no process resolves
    /// it any more, then its storage.
    #[tracing::instrument(name = "service.delete_queue", skip(self), fields(queue_id = %queue_id))]
    pub async fn delete_queue(&self, queue_id: &QueueId) -> Result<()> {
        let metadata = self.metadata.get_queue_metadata(queue_id, &[]).await?;
        self.metadata.delete_queue_metadata(queue_id).await?;
        self.queue_manager(&metadata)
            .await?
            .delete_queue(&metadata)
            .await?;

        QueueMetrics::record_deleted();
        tracing::info!(queue_id = %queue_id, "Queue deleted");
        Ok(())
    }

    #[tracing::instrument(
        name = "service.create_resource",
        skip(self, resource),
        fields(resource_id = %resource.resource_id)
    )]
    pub async fn create_resource(&self, resource: ResourceMetadata) -> Result<()> {
        resource.validate()?;
        self.metadata.register_resource(&resource).await?;
        tracing::info!(resource_id = %resource.resource_id, "Resource registered");
        Ok(())
    }

    #[tracing::instrument(
        name = "service.create_message",
        skip(self, request),
        fields(queue_id = %request.queue_id)
    )]
    pub async fn create_message(&self, request: EnqueueMessageRequest) -> Result<MessageId> {
        let queue = self.active_queue(&request.queue_id).await?;
        let id = queue.add(&request).await?;

        MessageMetrics::record_enqueued();
        tracing::debug!(queue_id = %request.queue_id, message_id = %id, "Message enqueued");
        Ok(id)
    }

    #[tracing::instrument(name = "service.ack_message", skip(self, ack_key), fields(queue_id = %queue_id))]
    pub async fn ack_message(&self, queue_id: &QueueId, ack_key: &str) -> Result<()> {
        let queue = self.active_queue(queue_id).await?;
        match queue.ack(ack_key).await {
            Ok(()) => {
                MessageMetrics::record_acked();
                Ok(())
            }
            Err(BrokerError::AckIneffective) => {
                MessageMetrics::record_ack_ineffective();
                Err(BrokerError::AckIneffective)
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(
        name = "service.poll_queue",
        skip(self, request),
        fields(queue_id = %request.queue_id, limit = request.limit)
    )]
    pub async fn poll_queue(&self, request: PollQueueRequest) -> Result<Vec<Message>> {
        if request.limit == 0 || request.limit > self.config.max_poll_limit {
            return Err(BrokerError::Validation(format!(
                "limit must be between 1 and {}",
                self.config.max_poll_limit
            )));
        }
        if request.visibility > self.config.max_visibility {
            return Err(BrokerError::Validation(format!(
                "visibility must not exceed {}s",
                self.config.max_visibility.as_secs()
            )));
        }
        let params = LongPoll {
            limit: request.limit,
            timeout: request.timeout.min(self.config.max_poll_timeout),
            visibility: request.visibility,
        };

        let queue = self.active_queue(&request.queue_id).await?;

        let started = Instant::now();
        let result = long_poll(queue.as_ref(), params, self.waiter.as_ref()).await;
        POLL_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        let messages = match result {
            Ok(messages) => messages,
            Err(LongPollError { collected, source }) if !collected.is_empty() => {
                // Already claimed; dropping them would hide them until the
                // visibility timeout expires.
                tracing::warn!(
                    queue_id = %request.queue_id,
                    error = %source,
                    returned = collected.len(),
                    "Long poll failed, returning partial result"
                );
                collected
            }
            Err(e) => return Err(e.source),
        };

        MessageMetrics::record_polled(messages.len());
        Ok(messages)
    }
}
