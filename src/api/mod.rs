//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod messages;
mod metrics;
mod params;
mod queues;
mod resources;
mod routes;

pub use health::{health, HealthResponse};
pub use messages::{ack_message, create_message, poll_messages, CreateMessageResponse, PollResponse};
pub use metrics::prometheus_metrics;
pub use queues::{create_queue, delete_queue};
pub use resources::create_resource;
pub use routes::v1_routes;
