//! HTTP surface tests
//!
//! Build the full router over in-memory components and drive it with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use barnacle::config::Settings;
use barnacle::metadata::{MemoryMetadataRepository, MetadataStore};
use barnacle::notify::MemoryNotifier;
use barnacle::server::{connector_registry, create_app, service_config, AppState};
use barnacle::service::Service;

fn app_with(settings: Settings) -> Router {
    let notifier = Arc::new(MemoryNotifier::new());
    let metadata = Arc::new(MetadataStore::new(
        Arc::new(MemoryMetadataRepository::new()),
        notifier.clone(),
    ));
    let service = Service::new(
        metadata,
        Arc::new(connector_registry(&settings)),
        service_config(&settings),
    );
    create_app(AppState::new(settings, Arc::new(service), notifier, None))
}

fn memory_settings() -> Settings {
    let mut settings = Settings::default();
    settings.metadata.backend = "memory".into();
    settings.notify.backend = "memory".into();
    settings
}

fn app() -> Router {
    app_with(memory_settings())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

/// Register the `main` memory resource and the `orders` queue.
async fn setup_queue(app: &Router) {
    let (status, _) = send(
        app,
        post_json("/v1/resources.create", json!({"id": "main", "options": {"uri": "memory://main"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        post_json(
            "/v1/queues.create",
            json!({"id": "orders", "resource": "main", "backend": "memory", "type": "simple-delay"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_message_round_trip() {
    let app = app();
    setup_queue(&app).await;

    let (status, body) = send(
        &app,
        post_json("/v1/messages.create", json!({"queue": "orders", "data": "hello", "delay": "0s"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "1");

    let (status, body) = send(&app, get("/v1/messages.poll?queue=orders&limit=10&timeout=1")).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["data"], "hello");
    let key = messages[0]["ack_key"].as_str().unwrap().to_string();
    assert!(key.starts_with("1/"));

    let (status, _) = send(&app, post(&format!("/v1/messages.ack?queue=orders&key={key}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get(&format!("/v1/messages.ack?queue=orders&key={key}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ACK_INEFFECTIVE");
}

#[tokio::test]
async fn test_poll_accepts_post() {
    let app = app();
    setup_queue(&app).await;

    let (status, body) = send(&app, post("/v1/messages.poll?queue=orders&limit=1&timeout=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn test_missing_or_malformed_parameters_are_unprocessable() {
    let app = app();
    setup_queue(&app).await;

    for uri in [
        "/v1/messages.poll?limit=1",
        "/v1/messages.poll?queue=orders",
        "/v1/messages.poll?queue=orders&limit=many",
        "/v1/messages.ack?queue=orders",
        "/v1/messages.ack?key=1/abcdefg",
    ] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER", "{uri}");
    }
}

#[tokio::test]
async fn test_out_of_range_limit_is_bad_request() {
    let app = app();
    setup_queue(&app).await;

    let (status, body) = send(&app, get("/v1/messages.poll?queue=orders&limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_excessive_visibility_is_bad_request() {
    let app = app();
    setup_queue(&app).await;

    let (status, body) = send(
        &app,
        get("/v1/messages.poll?queue=orders&limit=1&timeout=0&visibility=18446744073709551615"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unparsable_timeout_uses_default() {
    let app = app();
    setup_queue(&app).await;

    let started = std::time::Instant::now();
    let (status, _) = send(&app, get("/v1/messages.poll?queue=orders&limit=1&timeout=soon")).await;
    assert_eq!(status, StatusCode::OK);
    // Default timeout is one second.
    assert!(started.elapsed() >= std::time::Duration::from_millis(900));
}

#[tokio::test]
async fn test_unknown_queue_is_not_found() {
    let app = app();

    let (status, body) = send(&app, get("/v1/messages.poll?queue=missing&limit=1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        post_json("/v1/messages.create", json!({"queue": "missing", "data": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_queue_is_conflict() {
    let app = app();
    setup_queue(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/v1/queues.create",
            json!({"id": "orders", "resource": "main", "backend": "memory", "type": "simple-delay"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_delete_queue_endpoint() {
    let app = app();
    setup_queue(&app).await;

    let (status, _) = send(&app, post("/v1/queues.delete?queue=orders")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, post("/v1/queues.delete?queue=orders")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_delay_is_rejected() {
    let app = app();
    setup_queue(&app).await;

    let (status, _) = send(
        &app,
        post_json("/v1/messages.create", json!({"queue": "orders", "delay": "soon"})),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_api_key_guards_v1_only() {
    let mut settings = memory_settings();
    settings.api.key = Some("secret".into());
    let app = app_with(settings);

    let (status, body) = send(&app, get("/v1/messages.poll?queue=orders&limit=1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let request = Request::get("/v1/messages.poll?queue=orders&limit=1")
        .header("X-API-Key", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::get("/v1/messages.poll?queue=orders&limit=1")
        .header("X-API-Key", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = app();
    setup_queue(&app).await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["metadata"]["backend"], "memory");
    assert!(body["metadata"].get("pool").is_none());
    assert_eq!(body["queue_backends"], json!(["memory", "postgres"]));

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("barnacle_queues_created_total"));
}
