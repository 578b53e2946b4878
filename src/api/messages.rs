//! Message endpoints: enqueue, long-poll and acknowledge.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::domain::{EnqueueMessageRequest, Message, MessageId};
use crate::infrastructure::error::Result;
use crate::server::AppState;
use crate::service::PollQueueRequest;

use super::params::{self, AckParams, PollParams};

#[derive(Debug, Serialize)]
pub struct CreateMessageResponse {
    pub id: MessageId,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub messages: Vec<Message>,
}

/// POST /v1/messages.create
#[tracing::instrument(
    name = "http.create_message",
    skip(state, request),
    fields(queue_id = %request.queue_id)
)]
pub async fn create_message(
    State(state): State<AppState>,
    Json(request): Json<EnqueueMessageRequest>,
) -> Result<Json<CreateMessageResponse>> {
    let id = state.service.create_message(request).await?;
    Ok(Json(CreateMessageResponse { id }))
}

/// GET|POST /v1/messages.poll?queue=&limit=&timeout=&visibility=
#[tracing::instrument(name = "http.poll_messages", skip(state, query))]
pub async fn poll_messages(
    State(state): State<AppState>,
    Query(query): Query<PollParams>,
) -> Result<Json<PollResponse>> {
    let queue_id = params::queue_id(&query.queue)?;
    let limit = params::limit(&query.limit)?;
    let defaults = &state.settings.poll;

    let request = PollQueueRequest {
        queue_id,
        limit,
        timeout: params::seconds_or(&query.timeout, defaults.default_timeout()),
        visibility: params::seconds_or(&query.visibility, defaults.default_visibility()),
    };

    let messages = state.service.poll_queue(request).await?;
    Ok(Json(PollResponse { messages }))
}

/// GET|POST /v1/messages.ack?queue=&key=
#[tracing::instrument(name = "http.ack_message", skip(state, query))]
pub async fn ack_message(
    State(state): State<AppState>,
    Query(query): Query<AckParams>,
) -> Result<StatusCode> {
    let key = params::required(&query.key, "key")?;
    let queue_id = params::queue_id(&query.queue)?;

    state.service.ack_message(&queue_id, key).await?;
    Ok(StatusCode::OK)
}
