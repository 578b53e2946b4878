//! Domain layer
//!
//! Types shared by every part of the broker:
//! - `ids`: validated queue/resource identifiers and backend/queue type tags
//! - `metadata`: queue and resource configuration records
//! - `message`: messages, enqueue and poll requests
//! - `delay`: enqueue delay parsing
//! - `ack_key`: the opaque per-claim acknowledgment token
//! - `error`: the broker error taxonomy

pub mod ack_key;
pub mod delay;
pub mod error;
pub mod ids;
pub mod message;
pub mod metadata;

pub use ack_key::AckKey;
pub use delay::Delay;
pub use error::{BrokerError, ErrorKind, Result};
pub use ids::{BackendType, QueueId, QueueType, ResourceId};
pub use message::{EnqueueMessageRequest, Message, MessageId, PollRequest};
pub use metadata::{
    QueueMetadata, QueueOptions, QueueState, RegisterQueueRequest, ResourceConnOptions,
    ResourceMetadata,
};
