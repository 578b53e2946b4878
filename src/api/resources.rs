use axum::{extract::State, http::StatusCode, Json};

use crate::domain::ResourceMetadata;
use crate::infrastructure::error::Result;
use crate::server::AppState;

/// POST /v1/resources.create
#[tracing::instrument(
    name = "http.create_resource",
    skip(state, resource),
    fields(resource_id = %resource.resource_id)
)]
pub async fn create_resource(
    State(state): State<AppState>,
    Json(resource): Json<ResourceMetadata>,
) -> Result<StatusCode> {
    state.service.create_resource(resource).await?;
    Ok(StatusCode::OK)
}
