//! Configuration models for the worker pool and the job runner.

pub mod pool;
pub mod runner;

pub use pool::WorkerPoolConfig;
pub use runner::RunnerConfig;
