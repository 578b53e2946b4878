use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backends::{Backend, QueueManager};
use crate::domain::{BrokerError, QueueType, Result};

use super::delay_queue::{MemoryDelayQueueManager, MemoryTable};

pub(super) type Tables = Arc<Mutex<HashMap<String, MemoryTable>>>;

#[derive(Default)]
pub struct MemoryBackend {
    tables: Tables,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn queue_manager(&self, queue_type: &QueueType) -> Result<Arc<dyn QueueManager>> {
        match queue_type.as_str() {
            QueueType::SIMPLE_DELAY => Ok(Arc::new(MemoryDelayQueueManager::new(self.tables.clone()))),
            _ => Err(BrokerError::UnknownQueueType(queue_type.clone())),
        }
    }
}
