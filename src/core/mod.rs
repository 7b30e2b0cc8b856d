//! Core scheduling abstractions: jobs, resources, the worker pool and the runner.

pub mod error;
pub mod job;
pub mod resources;
pub mod runner;
pub mod scheduler;
pub mod worker_pool;

pub use error::{AppResult, InvocationError, RunnerError};
pub use job::{Job, JobId};
pub use resources::ResourceTable;
pub use runner::JobRunner;
pub use scheduler::RunnerStats;
pub use worker_pool::{PoolStats, Task, WorkerPool};
