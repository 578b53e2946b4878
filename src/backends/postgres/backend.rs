use std::sync::Arc;

use sqlx::PgPool;

use crate::backends::{Backend, QueueManager};
use crate::domain::{BrokerError, QueueType, Result};

use super::PostgresDelayQueueManager;

type ManagerConstructor = fn(&PgPool) -> Arc<dyn QueueManager>;

fn simple_delay(pool: &PgPool) -> Arc<dyn QueueManager> {
    Arc::new(PostgresDelayQueueManager::new(pool.clone()))
}

const QUEUE_MANAGERS: &[(&str, ManagerConstructor)] = &[(QueueType::SIMPLE_DELAY, simple_delay)];

/// A connection pool to one resource database.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Backend for PostgresBackend {
    fn queue_manager(&self, queue_type: &QueueType) -> Result<Arc<dyn QueueManager>> {
        QUEUE_MANAGERS
            .iter()
            .find(|(name, _)| *name == queue_type.as_str())
            .map(|(_, construct)| construct(&self.pool))
            .ok_or_else(|| BrokerError::UnknownQueueType(queue_type.clone()))
    }
}
