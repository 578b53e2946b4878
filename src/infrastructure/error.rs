use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{BrokerError, ErrorKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// A required query parameter is missing or not of the expected type.
    #[error("Invalid parameter: {0}")]
    Parameter(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

/// Status and error code for a broker error.
fn classify(err: &BrokerError) -> (StatusCode, &'static str) {
    match err {
        BrokerError::AckIneffective => (StatusCode::CONFLICT, "ACK_INEFFECTIVE"),
        BrokerError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED"),
        BrokerError::OrphanedMetadata { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "ORPHANED_METADATA")
        }
        _ => match err.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::Contention => (StatusCode::CONFLICT, "CONTENTION"),
            ErrorKind::Storage => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_ERROR"),
            ErrorKind::Fatal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = match &self {
            AppError::Broker(e) => {
                let (status, code) = classify(e);
                let log_msg = e.to_string();
                let client_msg = match e.kind() {
                    ErrorKind::Storage if is_production() => {
                        "Service temporarily unavailable".to_string()
                    }
                    ErrorKind::Fatal if is_production() => {
                        "Queue registration left stale metadata behind".to_string()
                    }
                    _ => log_msg.clone(),
                };
                (status, code, client_msg, log_msg)
            }
            AppError::Parameter(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_PARAMETER",
                msg.clone(),
                msg.clone(),
            ),
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueId;

    fn status_of(err: BrokerError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_broker_error_statuses() {
        assert_eq!(status_of(BrokerError::QueueIdInvalid("X".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BrokerError::InvalidAckKey("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(BrokerError::QueueNotFound(QueueId::new("q"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BrokerError::DuplicateQueue(QueueId::new("q"))),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(BrokerError::AckIneffective), StatusCode::CONFLICT);
        assert_eq!(status_of(BrokerError::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_of(BrokerError::Storage(sqlx::Error::PoolTimedOut)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_orphaned_metadata_code() {
        let err = BrokerError::OrphanedMetadata {
            queue_id: QueueId::new("orders"),
            provisioning: Box::new(BrokerError::StorageObjectExists("queues.orders".into())),
            cleanup: Box::new(BrokerError::Storage(sqlx::Error::PoolTimedOut)),
        };
        assert_eq!(classify(&err), (StatusCode::INTERNAL_SERVER_ERROR, "ORPHANED_METADATA"));
    }

    #[test]
    fn test_parameter_error_is_unprocessable() {
        let response = AppError::Parameter("missing limit".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
