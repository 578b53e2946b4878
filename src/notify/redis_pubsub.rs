//! Redis pub/sub transport.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use tokio::sync::broadcast;

use crate::infrastructure::backoff::ExponentialBackoff;

use super::{sleep_or_shutdown, Notification, Notifier, NotifyError, SUBSCRIBER_CAPACITY};

pub struct RedisNotifier {
    publisher: ConnectionManager,
    channel: String,
    tx: broadcast::Sender<Notification>,
    shutdown: broadcast::Sender<()>,
}

impl RedisNotifier {
    /// Open the publishing connection and start the subscriber task.
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self, NotifyError> {
        let channel = channel.into();
        let client = redis::Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;

        let (tx, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);

        tokio::spawn(listen_loop(
            client,
            channel.clone(),
            tx.clone(),
            shutdown.subscribe(),
        ));

        Ok(Self {
            publisher,
            channel,
            tx,
            shutdown,
        })
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        let mut conn = self.publisher.clone();
        conn.publish::<_, _, ()>(&self.channel, payload).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

async fn subscribe(client: &redis::Client, channel: &str) -> redis::RedisResult<PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    Ok(pubsub)
}

async fn listen_loop(
    client: redis::Client,
    channel: String,
    tx: broadcast::Sender<Notification>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut backoff = ExponentialBackoff::new();
    let mut reconnecting = false;

    loop {
        let mut pubsub = match subscribe(&client, &channel).await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Redis subscription failed"
                );
                if !sleep_or_shutdown(delay, &mut shutdown_rx).await {
                    return;
                }
                continue;
            }
        };

        backoff.reset();
        if reconnecting {
            let _ = tx.send(Notification::Resync);
        }
        reconnecting = true;
        tracing::info!(channel = %channel, "Redis subscription established");

        let mut messages = pubsub.on_message();
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!(channel = %channel, "Redis subscriber stopped");
                    return;
                }
                msg = messages.next() => match msg {
                    Some(msg) => match msg.get_payload::<String>() {
                        Ok(payload) => {
                            let _ = tx.send(Notification::Payload(payload));
                        }
                        Err(e) => tracing::warn!(error = %e, "Failed to get message payload"),
                    },
                    None => {
                        tracing::warn!(channel = %channel, "Redis message stream ended");
                        break;
                    }
                }
            }
        }
    }
}
