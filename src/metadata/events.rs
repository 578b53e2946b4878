//! Wire format of metadata change events.

use serde::{Deserialize, Serialize};

use crate::domain::QueueId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Registered,
    Activated,
    Deleted,
}

/// `{"qid": "...", "type": "registered" | "activated" | "deleted"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "qid")]
    pub queue_id: QueueId,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

impl QueueEvent {
    pub fn new(queue_id: QueueId, event_type: EventType) -> Self {
        Self {
            queue_id,
            event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = QueueEvent::new(QueueId::new("orders"), EventType::Deleted);
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"qid":"orders","type":"deleted"}"#
        );

        let parsed: QueueEvent =
            serde_json::from_str(r#"{"type":"activated","qid":"billing"}"#).unwrap();
        assert_eq!(parsed.queue_id.as_str(), "billing");
        assert_eq!(parsed.event_type, EventType::Activated);
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        assert!(serde_json::from_str::<QueueEvent>(r#"{"qid":"q","type":"renamed"}"#).is_err());
    }
}
