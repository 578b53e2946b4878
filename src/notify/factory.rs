use std::sync::Arc;

use sqlx::PgPool;

use crate::infrastructure::config::NotifyConfig;

use super::{MemoryNotifier, Notifier, NotifyError, PostgresNotifier, RedisNotifier};

/// Create the notifier selected by `notify.backend`.
///
/// - `"postgres"`: `LISTEN`/`NOTIFY` on the metadata database (needs `pool`)
/// - `"redis"`: Redis pub/sub on `notify.redis_url`
/// - `"memory"`: single-process bus, only coherent within one process
pub async fn create_notifier(
    config: &NotifyConfig,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.backend.as_str() {
        "postgres" => {
            let pool = pool.ok_or_else(|| {
                NotifyError::Config("postgres notifier requires a metadata database".into())
            })?;
            tracing::info!(backend = "postgres", channel = %config.channel, "Creating notifier");
            Ok(Arc::new(PostgresNotifier::start(pool.clone(), &config.channel)))
        }
        "redis" => {
            tracing::info!(backend = "redis", channel = %config.channel, "Creating notifier");
            Ok(Arc::new(
                RedisNotifier::connect(&config.redis_url, &config.channel).await?,
            ))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating notifier");
            Ok(Arc::new(MemoryNotifier::new()))
        }
        other => Err(NotifyError::Config(format!("unknown notify backend {other:?}"))),
    }
}
