//! Prometheus metrics for the broker.
//!
//! - Queue lifecycle (created, deleted, provisioning rollbacks)
//! - Message flow (enqueued, polled, acked, ineffective acks)
//! - Long-poll latency
//! - Metadata cache hit ratio and backend connections

mod helpers;

pub use helpers::{encode_metrics, MessageMetrics, QueueMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "barnacle";

lazy_static! {
    // ============================================================================
    // Queue Lifecycle Metrics
    // ============================================================================

    pub static ref QUEUES_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queues_created_total", METRIC_PREFIX),
        "Total queues registered and provisioned"
    ).unwrap();

    pub static ref QUEUES_DELETED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queues_deleted_total", METRIC_PREFIX),
        "Total queues deleted"
    ).unwrap();

    /// Provisioning failures, labelled by whether the metadata rollback worked
    pub static ref QUEUE_PROVISIONING_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_queue_provisioning_failures_total", METRIC_PREFIX),
        "Total failed queue provisionings",
        &["rollback"]
    ).unwrap();

    // ============================================================================
    // Message Metrics
    // ============================================================================

    pub static ref MESSAGES_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_enqueued_total", METRIC_PREFIX),
        "Total messages enqueued"
    ).unwrap();

    pub static ref MESSAGES_POLLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_polled_total", METRIC_PREFIX),
        "Total messages claimed by polls"
    ).unwrap();

    pub static ref MESSAGES_ACKED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_acked_total", METRIC_PREFIX),
        "Total messages acknowledged"
    ).unwrap();

    /// Acks whose claim had already expired or been acknowledged
    pub static ref ACKS_INEFFECTIVE_TOTAL: IntCounter = register_int_counter!(
        format!("{}_acks_ineffective_total", METRIC_PREFIX),
        "Total acknowledgements that matched no claimed message"
    ).unwrap();

    pub static ref POLL_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_poll_duration_seconds", METRIC_PREFIX),
        "Long-poll duration in seconds",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Metadata and Backend Metrics
    // ============================================================================

    pub static ref METADATA_CACHE_HITS: IntCounter = register_int_counter!(
        format!("{}_metadata_cache_hits_total", METRIC_PREFIX),
        "Active queue lookups served from the metadata cache"
    ).unwrap();

    pub static ref METADATA_CACHE_MISSES: IntCounter = register_int_counter!(
        format!("{}_metadata_cache_misses_total", METRIC_PREFIX),
        "Active queue lookups that went to the metadata repository"
    ).unwrap();

    pub static ref BACKEND_CONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_backend_connections_total", METRIC_PREFIX),
        "Total backend connections established for resources"
    ).unwrap();
}
