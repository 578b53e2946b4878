//! Identifiers used to address queues, resources and backend implementations.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{BrokerError, Result};

lazy_static! {
    static ref IDENTIFIER_PATTERN: Regex = Regex::new(r"^[_a-z][_a-z0-9]*$").unwrap();
}

/// Queue identifier, unique across the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(String);

impl QueueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the identifier against `^[_a-z][_a-z0-9]*$`.
    pub fn validate(&self) -> Result<()> {
        if IDENTIFIER_PATTERN.is_match(&self.0) {
            Ok(())
        } else {
            Err(BrokerError::QueueIdInvalid(self.0.clone()))
        }
    }
}

/// Identifier of a named connection target shared by one or more queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource ids follow the same pattern as queue ids.
    pub fn validate(&self) -> Result<()> {
        if IDENTIFIER_PATTERN.is_match(&self.0) {
            Ok(())
        } else {
            Err(BrokerError::ResourceIdInvalid(self.0.clone()))
        }
    }
}

/// Storage technology tag, e.g. `postgres`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendType(String);

impl BackendType {
    pub const POSTGRES: &'static str = "postgres";
    pub const MEMORY: &'static str = "memory";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Queue flavour implemented by a backend, e.g. `simple-delay`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueType(String);

impl QueueType {
    pub const SIMPLE_DELAY: &'static str = "simple-delay";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn simple_delay() -> Self {
        Self::new(Self::SIMPLE_DELAY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

macro_rules! impl_display_from {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $ty {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }

            impl From<String> for $ty {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }
        )*
    };
}

impl_display_from!(QueueId, ResourceId, BackendType, QueueType);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_queue_ids() {
        for id in ["orders", "_internal", "a1_b2", "x", "_"] {
            assert!(QueueId::new(id).validate().is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn test_invalid_queue_ids() {
        for id in ["", "Orders", "1orders", "orders-eu", "orders.eu", "ord ers"] {
            let err = QueueId::new(id).validate().unwrap_err();
            assert!(matches!(err, BrokerError::QueueIdInvalid(_)), "{id} should be invalid");
        }
    }

    #[test]
    fn test_resource_id_validation() {
        assert!(ResourceId::new("main_db").validate().is_ok());
        assert!(matches!(
            ResourceId::new("main-db").validate(),
            Err(BrokerError::ResourceIdInvalid(_))
        ));
    }

    #[test]
    fn test_transparent_serde() {
        let id: QueueId = serde_json::from_str("\"orders\"").unwrap();
        assert_eq!(id.as_str(), "orders");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"orders\"");
    }
}
