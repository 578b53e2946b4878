//! `LISTEN`/`NOTIFY` transport on the metadata database.

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool};
use tokio::sync::broadcast;

use crate::infrastructure::backoff::ExponentialBackoff;

use super::{sleep_or_shutdown, Notification, Notifier, NotifyError, SUBSCRIBER_CAPACITY};

pub struct PostgresNotifier {
    pool: PgPool,
    channel: String,
    tx: broadcast::Sender<Notification>,
    shutdown: broadcast::Sender<()>,
}

impl PostgresNotifier {
    /// Start listening on `channel` in a background task.
    pub fn start(pool: PgPool, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        let (tx, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);

        tokio::spawn(listen_loop(
            pool.clone(),
            channel.clone(),
            tx.clone(),
            shutdown.subscribe(),
        ));

        Self {
            pool,
            channel,
            tx,
            shutdown,
        }
    }
}

#[async_trait]
impl Notifier for PostgresNotifier {
    async fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(&self.channel)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

async fn connect(pool: &PgPool, channel: &str) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(channel).await?;
    Ok(listener)
}

async fn listen_loop(
    pool: PgPool,
    channel: String,
    tx: broadcast::Sender<Notification>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut backoff = ExponentialBackoff::new();
    let mut reconnecting = false;

    loop {
        let mut listener = match connect(&pool, &channel).await {
            Ok(listener) => listener,
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Postgres listener connect failed"
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
        tracing::info!(channel = %channel, "Postgres listener established");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!(channel = %channel, "Postgres listener stopped");
                    return;
                }
                received = listener.try_recv() => match received {
                    Ok(Some(notification)) => {
                        let _ = tx.send(Notification::Payload(notification.payload().to_string()));
                    }
                    Ok(None) => {
                        // The listener reconnects on the next call.
                        tracing::warn!(channel = %channel, "Postgres listener connection lost");
                        let _ = tx.send(Notification::Resync);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, channel = %channel, "Postgres listener failed");
                        break;
                    }
                }
            }
        }
    }
}
