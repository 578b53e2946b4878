//! Broker error taxonomy.
//!
//! Every fallible broker operation returns [`BrokerError`]. Callers that need
//! to decide how to react (HTTP status, retry, operator alert) use
//! [`BrokerError::kind`] instead of matching individual variants.

use thiserror::Error;

use crate::notify::NotifyError;

use super::ids::{BackendType, QueueId, QueueType, ResourceId};

/// Coarse classification of broker errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Never retried.
    Validation,
    /// Unknown queue, resource, connector or queue type.
    NotFound,
    /// Something with the same identity already exists.
    Conflict,
    /// Expected outcome of concurrent access (late ack, claim deadline).
    Contention,
    /// Storage or transport failure, propagated as-is.
    Storage,
    /// Requires operator intervention.
    Fatal,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("queue id invalid: {0:?}")]
    QueueIdInvalid(String),

    #[error("resource id invalid: {0:?}")]
    ResourceIdInvalid(String),

    #[error("{0}")]
    Validation(String),

    #[error("table name invalid: {0:?}")]
    InvalidTableName(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid delay: {0}")]
    InvalidDelay(String),

    #[error("invalid ack key: {0:?}")]
    InvalidAckKey(String),

    #[error("queue not found: {0}")]
    QueueNotFound(QueueId),

    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    #[error("connector not found: {0}")]
    ConnectorNotFound(BackendType),

    #[error("unknown queue type: {0}")]
    UnknownQueueType(QueueType),

    #[error("queue already registered: {0}")]
    DuplicateQueue(QueueId),

    #[error("resource already registered: {0}")]
    DuplicateResource(ResourceId),

    #[error("storage object already exists: {0}")]
    StorageObjectExists(String),

    #[error("ack ineffective")]
    AckIneffective,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "fatal: queue {queue_id} registration failed, stale metadata left behind \
         (provisioning: {provisioning}; cleanup: {cleanup})"
    )]
    OrphanedMetadata {
        queue_id: QueueId,
        provisioning: Box<BrokerError>,
        cleanup: Box<BrokerError>,
    },
}

impl BrokerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QueueIdInvalid(_)
            | Self::ResourceIdInvalid(_)
            | Self::Validation(_)
            | Self::InvalidTableName(_)
            | Self::InvalidOptions(_)
            | Self::InvalidDelay(_)
            | Self::InvalidAckKey(_) => ErrorKind::Validation,
            Self::QueueNotFound(_)
            | Self::ResourceNotFound(_)
            | Self::ConnectorNotFound(_)
            | Self::UnknownQueueType(_) => ErrorKind::NotFound,
            Self::DuplicateQueue(_) | Self::DuplicateResource(_) | Self::StorageObjectExists(_) => {
                ErrorKind::Conflict
            }
            Self::AckIneffective | Self::DeadlineExceeded => ErrorKind::Contention,
            Self::Storage(_) | Self::Notify(_) | Self::Serialization(_) => ErrorKind::Storage,
            Self::OrphanedMetadata { .. } => ErrorKind::Fatal,
        }
    }

    /// True only for the orphaned-metadata case that needs manual cleanup.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Postgres SQLSTATE codes the broker translates into domain errors.
pub(crate) mod codes {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const DUPLICATE_TABLE: &str = "42P07";
    pub const QUERY_CANCELED: &str = "57014";
}

/// SQLSTATE of a database error, if the error came from the server.
pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
