//! Structured logging setup for runner processes.
//!
//! Scheduler, worker and runner events are emitted through `tracing` with
//! `job_id` and `worker_id` fields; these helpers install a `fmt` subscriber
//! that prints them with the emitting thread's name
//! (`<prefix>-scheduler`, `<prefix>-worker-<n>`).

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "prometheus_job_runner=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or [`DEFAULT_LOG_FILTER`].
///
/// Does nothing if a global subscriber is already set, so callers and tests
/// can invoke it freely.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Same as [`init_tracing`] with a caller-chosen fallback filter.
///
/// Returns `true` if this call installed the subscriber.
pub fn init_tracing_with(fallback: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
