mod app;
mod middleware;
mod state;

pub use app::create_app;
pub use middleware::api_key_auth;
pub use state::{connector_registry, service_config, AppState};
