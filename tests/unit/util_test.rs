//! Tests for telemetry helpers

use prometheus_job_runner::util::{init_tracing, init_tracing_with, DEFAULT_LOG_FILTER};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    // A subscriber is now installed (by this test or another in the binary).
    assert!(!init_tracing_with("debug"));
    init_tracing();
}

#[test]
fn test_default_filter_targets_crate() {
    assert!(DEFAULT_LOG_FILTER.starts_with("prometheus_job_runner"));
}
