//! Messages and the requests that produce or consume them.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::delay::Delay;
use super::ids::QueueId;

/// Storage-assigned message identifier rendered as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn from_storage(id: i64) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A claimed message as returned by a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub data: String,
    pub ack_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueMessageRequest {
    #[serde(rename = "queue")]
    pub queue_id: QueueId,
    #[serde(default)]
    pub delay: Delay,
    #[serde(default)]
    pub data: String,
}

/// A single claim attempt against a queue.
#[derive(Debug, Clone, Copy)]
pub struct PollRequest {
    /// Maximum number of messages to claim.
    pub limit: usize,
    /// The claim must complete before this instant.
    pub deadline: Instant,
    /// How long claimed messages stay hidden from other pollers.
    pub visibility: Duration,
}

impl PollRequest {
    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
