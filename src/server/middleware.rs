use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::AppState;

/// API key authentication for `/v1/*`.
/// Validates the `X-API-Key` header against the configured `api.key`.
pub async fn api_key_auth(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    // No key configured: open access
    let Some(expected_key) = &state.settings.api.key else {
        return next.run(req).await;
    };

    let api_key = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

    match api_key {
        Some(key) if key == expected_key => next.run(req).await,
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "Invalid API key provided");
            unauthorized("Invalid API key")
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "Missing API key header");
            unauthorized("Missing X-API-Key header")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    let body = json!({
        "error": {
            "code": "UNAUTHORIZED",
            "message": message
        }
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
