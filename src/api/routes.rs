use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::messages::{ack_message, create_message, poll_messages};
use super::queues::{create_queue, delete_queue};
use super::resources::create_resource;

/// Broker endpoints, mounted under `/v1`.
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        // Queues
        .route("/queues.create", post(create_queue))
        .route("/queues.delete", post(delete_queue))
        // Resources
        .route("/resources.create", post(create_resource))
        // Messages
        .route("/messages.create", post(create_message))
        .route("/messages.poll", get(poll_messages).post(poll_messages))
        .route("/messages.ack", get(ack_message).post(ack_message))
}
