//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::infrastructure::postgres::PoolStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub metadata: MetadataHealthResponse,
    /// Backend types queues can be created on.
    pub queue_backends: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MetadataHealthResponse {
    pub backend: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
    pub notify_backend: String,
}

/// GET /health
///
/// 503 when the metadata database does not answer, since no queue can be
/// resolved without it.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (connected, pool) = match &state.metadata_pool {
        Some(pool) => {
            let connected = match pool.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Metadata database health check failed");
                    false
                }
            };
            (connected, Some(pool.stats()))
        }
        None => (true, None),
    };

    let (status, label) = if connected {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let mut queue_backends: Vec<String> = state
        .service
        .connectors()
        .backend_types()
        .map(ToString::to_string)
        .collect();
    queue_backends.sort();

    let body = HealthResponse {
        status: label.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metadata: MetadataHealthResponse {
            backend: state.settings.metadata.backend.clone(),
            connected,
            pool,
            notify_backend: state.settings.notify.backend.clone(),
        },
        queue_backends,
    };

    (status, Json(body))
}
