//! Query-string parameters of the ack and poll endpoints.
//!
//! Everything arrives as optional strings so that a missing or malformed
//! value becomes a 422 with a useful message instead of axum's generic
//! query rejection.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::QueueId;
use crate::infrastructure::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    pub queue: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AckParams {
    pub queue: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PollParams {
    pub queue: Option<String>,
    pub limit: Option<String>,
    pub timeout: Option<String>,
    pub visibility: Option<String>,
}

pub(crate) fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Parameter(format!("{name} must be set"))),
    }
}

pub(crate) fn queue_id(value: &Option<String>) -> Result<QueueId, AppError> {
    required(value, "queue").map(QueueId::new)
}

/// `limit` must be present and an integer. Range checks happen in the service.
pub(crate) fn limit(value: &Option<String>) -> Result<usize, AppError> {
    let raw = required(value, "limit")?;
    let parsed: i64 = raw
        .parse()
        .map_err(|_| AppError::Parameter(format!("limit must be an integer, got {raw:?}")))?;
    // Negative limits reach the service as 0 and fail its range check.
    Ok(usize::try_from(parsed).unwrap_or(0))
}

/// Whole seconds, falling back to `default` when absent or unparsable.
pub(crate) fn seconds_or(value: &Option<String>, default: Duration) -> Duration {
    value
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_missing_required_parameters() {
        assert!(matches!(queue_id(&None), Err(AppError::Parameter(m)) if m.contains("queue")));
        assert!(matches!(queue_id(&some("")), Err(AppError::Parameter(_))));
        assert!(matches!(required(&None, "key"), Err(AppError::Parameter(m)) if m.contains("key")));
        assert_eq!(queue_id(&some("orders")).unwrap().as_str(), "orders");
    }

    #[test]
    fn test_limit_parsing() {
        assert_eq!(limit(&some("5")).unwrap(), 5);
        assert_eq!(limit(&some("-3")).unwrap(), 0);
        assert!(matches!(limit(&None), Err(AppError::Parameter(_))));
        assert!(matches!(limit(&some("five")), Err(AppError::Parameter(_))));
        assert!(matches!(limit(&some("1.5")), Err(AppError::Parameter(_))));
    }

    #[test]
    fn test_seconds_fall_back_to_default() {
        let default = Duration::from_secs(60);
        assert_eq!(seconds_or(&some("5"), default), Duration::from_secs(5));
        assert_eq!(seconds_or(&some("0"), default), Duration::ZERO);
        assert_eq!(seconds_or(&None, default), default);
        assert_eq!(seconds_or(&some("soon"), default), default);
        assert_eq!(seconds_or(&some("-1"), default), default);
    }
}
