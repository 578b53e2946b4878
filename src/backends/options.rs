//! Strict decoding of backend-specific option maps.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::{BrokerError, QueueId, Result};

lazy_static! {
    static ref TABLE_NAME_PATTERN: Regex = Regex::new(r"^[a-z][a-z0-9_]{0,31}$").unwrap();
}

/// Decode an open JSON object into `T`, rejecting unknown fields.
pub fn decode<T: DeserializeOwned>(options: &serde_json::Map<String, serde_json::Value>) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(options.clone()))
        .map_err(|e| BrokerError::InvalidOptions(e.to_string()))
}

/// Connection options of a resource served by a SQL backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UriConnOptions {
    pub uri: String,
}

/// Options of a `simple-delay` queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayQueueOptions {
    #[serde(default)]
    pub table: Option<String>,
}

impl DelayQueueOptions {
    /// The storage table name, defaulting to the queue id.
    pub fn table_name(&self, queue_id: &QueueId) -> Result<String> {
        let table = self
            .table
            .clone()
            .unwrap_or_else(|| queue_id.as_str().to_string());

        if TABLE_NAME_PATTERN.is_match(&table) {
            Ok(table)
        } else {
            Err(BrokerError::InvalidTableName(table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_table_defaults_to_queue_id() {
        let options: DelayQueueOptions = decode(&map(json!({}))).unwrap();
        assert_eq!(options.table_name(&QueueId::new("orders")).unwrap(), "orders");

        let options: DelayQueueOptions = decode(&map(json!({"table": "orders_v2"}))).unwrap();
        assert_eq!(options.table_name(&QueueId::new("orders")).unwrap(), "orders_v2");
    }

    #[test]
    fn test_table_name_pattern_is_anchored() {
        let too_long = "a".repeat(33);
        for table in ["Orders", "1orders", "orders;drop", "_orders", too_long.as_str()] {
            let options = DelayQueueOptions {
                table: Some(table.to_string()),
            };
            assert!(
                matches!(options.table_name(&QueueId::new("q")), Err(BrokerError::InvalidTableName(_))),
                "{table} should be rejected"
            );
        }
        let options = DelayQueueOptions {
            table: Some("a".repeat(32)),
        };
        assert!(options.table_name(&QueueId::new("q")).is_ok());
    }

    #[test]
    fn test_queue_id_leading_underscore_needs_explicit_table() {
        let options = DelayQueueOptions::default();
        assert!(options.table_name(&QueueId::new("_internal")).is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = decode::<DelayQueueOptions>(&map(json!({"table": "t", "ttl": 5}))).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidOptions(_)));

        let err = decode::<UriConnOptions>(&map(json!({}))).unwrap_err();
        assert!(err.to_string().contains("uri"));
    }
}
