//! Queue and resource configuration records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{BrokerError, Result};
use super::ids::{BackendType, QueueId, QueueType, ResourceId};

/// Queue-type specific settings, e.g. `{"table": "orders"}`.
pub type QueueOptions = serde_json::Map<String, serde_json::Value>;

/// Resource connection settings, e.g. `{"uri": "postgres://..."}`.
pub type ResourceConnOptions = serde_json::Map<String, serde_json::Value>;

/// Lifecycle state of a queue.
///
/// A queue stays `Inactive` until its physical storage is provisioned, then
/// becomes `Active`. Only active queues accept messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Inactive,
    Active,
}

impl QueueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueState {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            other => Err(BrokerError::Validation(format!("unknown queue state {other:?}"))),
        }
    }
}

/// Durable configuration of one queue, joined with its resource's
/// connection options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMetadata {
    pub queue_id: QueueId,
    pub resource_id: ResourceId,
    pub backend_type: BackendType,
    pub queue_type: QueueType,
    pub queue_state: QueueState,
    pub options: QueueOptions,
    pub conn_options: ResourceConnOptions,
}

/// A named, reusable connection target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    #[serde(rename = "id")]
    pub resource_id: ResourceId,
    #[serde(rename = "options", default)]
    pub conn_options: ResourceConnOptions,
}

impl ResourceMetadata {
    pub fn validate(&self) -> Result<()> {
        self.resource_id.validate()
    }
}

/// Request to register and provision a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterQueueRequest {
    #[serde(rename = "id")]
    pub queue_id: QueueId,
    #[serde(rename = "resource")]
    pub resource_id: ResourceId,
    #[serde(rename = "backend", default)]
    pub backend_type: BackendType,
    #[serde(rename = "type", default)]
    pub queue_type: QueueType,
    #[serde(default)]
    pub options: QueueOptions,
}

impl RegisterQueueRequest {
    pub fn validate(&self) -> Result<()> {
        self.queue_id.validate()?;
        self.resource_id.validate()?;
        if self.backend_type.is_empty() {
            return Err(BrokerError::Validation("backend type can not be empty".into()));
        }
        if self.queue_type.is_empty() {
            return Err(BrokerError::Validation("queue type can not be empty".into()));
        }
        Ok(())
    }
}
