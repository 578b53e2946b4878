//! Publish/subscribe transport for metadata change events.
//!
//! Every broker process publishes a small JSON payload on one shared channel
//! and receives every payload published by any process, itself included.
//! Subscribers see a [`Notification::Resync`] whenever the transport may
//! have dropped payloads (reconnect), so they can discard derived state.

mod factory;
mod memory;
mod postgres_listen;
mod redis_pubsub;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub use factory::create_notifier;
pub use memory::MemoryNotifier;
pub use postgres_listen::PostgresNotifier;
pub use redis_pubsub::RedisNotifier;

/// Capacity of the in-process fan-out channel behind every notifier.
pub(crate) const SUBSCRIBER_CAPACITY: usize = 1024;

/// Default channel name shared by all broker processes.
pub const DEFAULT_CHANNEL: &str = "_bcl_mq_events";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A payload published by some process.
    Payload(String),
    /// The transport reconnected; payloads may have been lost.
    Resync,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("postgres notify error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("redis notify error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("notify backend misconfigured: {0}")]
    Config(String),
}

/// A broadcast transport for short text payloads.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish a payload to every subscriber on every process.
    async fn publish(&self, payload: &str) -> Result<(), NotifyError>;

    /// Receive payloads published from now on.
    fn subscribe(&self) -> broadcast::Receiver<Notification>;

    /// Stop background listeners. Subscribers observe a closed channel once
    /// every notifier handle is dropped.
    fn shutdown(&self) {}

    /// Backend name, for logs.
    fn name(&self) -> &'static str;
}

/// Sleep for `delay` unless shutdown is requested first. Returns `false` on
/// shutdown.
pub(crate) async fn sleep_or_shutdown(
    delay: Duration,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> bool {
    tokio::select! {
        _ = shutdown_rx.recv() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
