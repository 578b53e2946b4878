//! Queue lifecycle endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::domain::RegisterQueueRequest;
use crate::infrastructure::error::Result;
use crate::server::AppState;

use super::params::{queue_id, QueueParams};

/// POST /v1/queues.create
#[tracing::instrument(
    name = "http.create_queue",
    skip(state, request),
    fields(queue_id = %request.queue_id)
)]
pub async fn create_queue(
    State(state): State<AppState>,
    Json(request): Json<RegisterQueueRequest>,
) -> Result<StatusCode> {
    state.service.create_queue(request).await?;
    Ok(StatusCode::OK)
}

/// POST /v1/queues.delete?queue=
#[tracing::instrument(name = "http.delete_queue", skip(state, params))]
pub async fn delete_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> Result<StatusCode> {
    let queue_id = queue_id(&params.queue)?;
    state.service.delete_queue(&queue_id).await?;
    Ok(StatusCode::OK)
}
