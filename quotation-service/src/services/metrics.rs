//! Prometheus metrics for quotation-service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec,
};

/// Quotation counter by status.
pub static QUOTATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quotation_quotations_total",
        "Total number of quotations by status",
        &["status"] // draft, sent, pending_approval, approved, rejected
    )
    .expect("Failed to register quotations_total")
});

/// Approval decision counter.
pub static APPROVAL_DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quotation_approval_decisions_total",
        "Total number of approval decisions",
        &["decision"]
    )
    .expect("Failed to register approval_decisions_total")
});

/// Monetary amount counter by currency, recorded when a quotation is approved.
pub static QUOTATION_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quotation_amount_total",
        "Total approved quotation amount by currency",
        &["currency"]
    )
    .expect("Failed to register quotation_amount_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quotation_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quotation_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&QUOTATIONS_TOTAL);
    Lazy::force(&APPROVAL_DECISIONS_TOTAL);
    Lazy::force(&QUOTATION_AMOUNT_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
