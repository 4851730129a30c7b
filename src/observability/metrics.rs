//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `bucket_controller_reconciliations_total` - Reconciliations by resource kind
//! - `bucket_controller_reconciliation_errors_total` - Failed reconciliations by resource kind
//! - `bucket_controller_reconciliation_duration_seconds` - Duration of reconciliation operations
//! - `bucket_controller_requeues_total` - Requeues by reason
//! - `bucket_controller_buckets_created_total` - Remote buckets created
//! - `bucket_controller_buckets_deleted_total` - Remote buckets deleted
//! - `bucket_controller_store_operations_total` - Bucket store calls by operation and result
//! - `bucket_controller_store_operation_duration_seconds` - Duration of bucket store calls

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_controller_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_controller_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "bucket_controller_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_controller_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static BUCKETS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bucket_controller_buckets_created_total",
        "Total number of remote buckets created",
    )
    .expect("Failed to create BUCKETS_CREATED_TOTAL metric - this should never happen")
});

static BUCKETS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bucket_controller_buckets_deleted_total",
        "Total number of remote buckets deleted",
    )
    .expect("Failed to create BUCKETS_DELETED_TOTAL metric - this should never happen")
});

static STORE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_controller_store_operations_total",
            "Total number of bucket store operations by operation and result",
        ),
        &["operation", "result"],
    )
    .expect("Failed to create STORE_OPERATIONS_TOTAL metric - this should never happen")
});

static STORE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "bucket_controller_store_operation_duration_seconds",
            "Duration of bucket store operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BUCKETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BUCKETS_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATION_DURATION.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_buckets_created() {
    BUCKETS_CREATED_TOTAL.inc();
}

pub fn increment_buckets_deleted() {
    BUCKETS_DELETED_TOTAL.inc();
}

/// Record a single bucket store call
pub fn record_store_operation(operation: &str, success: bool, duration: f64) {
    let result = if success { "success" } else { "error" };
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
    STORE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

/// Render every registered metric in the Prometheus text format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_operation_is_labelled_by_result() {
        record_store_operation("create_bucket", true, 0.01);
        record_store_operation("create_bucket", false, 0.02);

        let ok = STORE_OPERATIONS_TOTAL
            .with_label_values(&["create_bucket", "success"])
            .get();
        let failed = STORE_OPERATIONS_TOTAL
            .with_label_values(&["create_bucket", "error"])
            .get();
        assert!(ok >= 1);
        assert!(failed >= 1);
    }

    #[test]
    fn test_requeue_reason_counter() {
        let before = REQUEUES_TOTAL.with_label_values(&["relist"]).get();
        increment_requeues_total("relist");
        assert_eq!(REQUEUES_TOTAL.with_label_values(&["relist"]).get(), before + 1);
    }
}
