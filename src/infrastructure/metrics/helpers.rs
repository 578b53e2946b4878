//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    ACKS_INEFFECTIVE_TOTAL, MESSAGES_ACKED_TOTAL, MESSAGES_ENQUEUED_TOTAL, MESSAGES_POLLED_TOTAL,
    QUEUES_CREATED_TOTAL, QUEUES_DELETED_TOTAL, QUEUE_PROVISIONING_FAILURES_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_created() {
        QUEUES_CREATED_TOTAL.inc();
    }

    pub fn record_deleted() {
        QUEUES_DELETED_TOTAL.inc();
    }

    /// `rolled_back` is false when the metadata row could not be removed.
    pub fn record_provisioning_failure(rolled_back: bool) {
        let label = if rolled_back { "ok" } else { "failed" };
        QUEUE_PROVISIONING_FAILURES_TOTAL
            .with_label_values(&[label])
            .inc();
    }
}

pub struct MessageMetrics;

impl MessageMetrics {
    pub fn record_enqueued() {
        MESSAGES_ENQUEUED_TOTAL.inc();
    }

    pub fn record_polled(count: usize) {
        MESSAGES_POLLED_TOTAL.inc_by(count as u64);
    }

    pub fn record_acked() {
        MESSAGES_ACKED_TOTAL.inc();
    }

    pub fn record_ack_ineffective() {
        ACKS_INEFFECTIVE_TOTAL.inc();
    }
}
