//! # Prometheus Job Runner
//!
//! A resource-aware batch job runner built on a resizable pool of dedicated
//! worker threads.
//!
//! A [`JobRunner`](core::JobRunner) is handed a fixed set of jobs and a table of
//! named, finite-capacity resources (`"cpu": 2`, `"gpu": 1`). Each job names the
//! resources it needs and runs a work function that reports a *settle delay*,
//! extra time before the worker that ran it becomes idle again.
//!
//! ## Moving Parts
//!
//! - **PriorityLock**: one mutual-exclusion primitive with three priority
//!   classes (resize > recovery > scheduling) guarding all shared state
//! - **ResourceTable**: available count per resource name
//! - **WorkerPool**: resizable set of worker threads over a FIFO queue; also
//!   offers generic fire-and-forget and blocking invocation
//! - **Scheduler**: a dedicated thread that admits pending jobs first-fit when
//!   their resources and an idle worker are available, then sleeps until a
//!   resize or a recovery wakes it
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use prometheus_job_runner::core::{Job, JobRunner};
//!
//! let jobs = vec![
//!     Job::with_settle_millis(["cpu"], || 5),
//!     Job::with_settle_millis(["cpu"], || 1),
//! ];
//!
//! // No workers yet: nothing is admitted until the pool grows.
//! let runner = JobRunner::from_parts([("cpu", 1)], jobs, 0).unwrap();
//! assert_eq!(runner.stats().pending_jobs, 2);
//!
//! runner.resize(1).unwrap();
//! assert!(runner.wait_idle(Duration::from_secs(5)));
//! runner.shutdown();
//! ```
//!
//! For more, see `tests/job_runner_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and resource accounting.
pub mod core;
/// Configuration models for the pool and the runner.
pub mod config;
/// Three-class priority lock.
pub mod priority_lock;
/// Shared utilities.
pub mod util;

pub use priority_lock::{LockClass, PriorityLock, PriorityLockGuard};
