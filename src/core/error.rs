//! Error types for runner and worker pool operations.

use thiserror::Error;

use super::job::JobId;

/// Errors produced by the job runner and its worker pool.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A job's resources were reserved while not fully available.
    #[error("insufficient resources for job {job}: `{resource}` exhausted")]
    InsufficientResources {
        /// Job whose reservation failed.
        job: JobId,
        /// First resource name that could not be satisfied.
        resource: String,
    },
    /// An OS thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// The pool or runner has been shut down.
    #[error("runner has been shut down")]
    ShutDown,
}

/// Errors surfaced to callers blocked on a pool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The submitted work panicked; carries the panic message.
    #[error("invocation failed: {0}")]
    Panicked(String),
    /// The wait deadline elapsed before the work completed.
    #[error("invocation timed out")]
    Timeout,
    /// The work was discarded before it ran (pool torn down).
    #[error("invocation interrupted before completion")]
    Interrupted,
    /// The pool was already shut down when the work was submitted.
    #[error("pool has been shut down")]
    ShutDown,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
