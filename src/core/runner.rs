//! Job runner facade.
//!
//! A [`JobRunner`] owns the resource table, the pending jobs, the worker pool,
//! the priority lock and the scheduler thread. The job set is closed at
//! construction; the only runtime mutation is [`JobRunner::resize`].
//!
//! ```
//! use std::time::Duration;
//! use prometheus_job_runner::config::RunnerConfig;
//! use prometheus_job_runner::core::{Job, JobRunner};
//!
//! let jobs = vec![
//!     Job::new(["cpu"], || Duration::from_millis(1)),
//!     Job::new(["cpu", "gpu"], || Duration::ZERO),
//! ];
//! let runner = JobRunner::new(&RunnerConfig::new([("cpu", 2), ("gpu", 1)], 2), jobs).unwrap();
//! assert!(runner.wait_idle(Duration::from_secs(5)));
//! assert_eq!(runner.stats().completed_jobs, 2);
//! runner.shutdown();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::core::error::RunnerError;
use crate::core::job::{Job, JobId};
use crate::core::resources::ResourceTable;
use crate::core::scheduler::{self, Completion, RunnerState, RunnerStats, Shared, WakeSignal};
use crate::core::worker_pool::WorkerPool;
use crate::priority_lock::{LockClass, PriorityLock};

/// Runs a fixed batch of jobs against named resources on a resizable pool.
pub struct JobRunner {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl JobRunner {
    /// Seed the resource table and pending list, start the workers and the scheduler.
    ///
    /// Jobs are identified by their position in `jobs`. A job naming a resource
    /// the table can never satisfy is kept pending forever (and logged).
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::InvalidConfig` for an invalid configuration and
    /// `RunnerError::Spawn` if a thread cannot be started.
    pub fn new(config: &RunnerConfig, jobs: Vec<Job>) -> Result<Self, RunnerError> {
        config.validate().map_err(RunnerError::InvalidConfig)?;

        let resources = ResourceTable::new(config.resources.clone());
        let pending: VecDeque<(JobId, Job)> = (0..).zip(jobs).collect();
        for (id, job) in &pending {
            if !resources.can_ever_satisfy(job.resources()) {
                warn!(job_id = id, resources = ?job.resources(), "Job can never be admitted");
            }
        }
        let job_count = pending.len();

        let shared = Arc::new(Shared {
            state: PriorityLock::new(RunnerState::new(resources, pending)),
            pool: WorkerPool::new(&config.workers)?,
            wake: WakeSignal::new(),
            drained: Completion::default(),
        });
        if job_count == 0 {
            shared.drained.set();
        }

        let scheduler = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("{}-scheduler", config.workers.thread_name_prefix))
                .spawn(move || scheduler::run(&shared))
        };
        let scheduler = match scheduler {
            Ok(handle) => handle,
            Err(e) => {
                shared.pool.shutdown();
                return Err(e.into());
            }
        };

        info!(
            jobs = job_count,
            workers = config.workers.worker_count,
            "JobRunner started"
        );
        Ok(Self {
            shared,
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    /// Convenience constructor from a resource map and an initial worker count.
    ///
    /// # Errors
    ///
    /// Same as [`JobRunner::new`].
    pub fn from_parts<I, S>(resources: I, jobs: Vec<Job>, workers: usize) -> Result<Self, RunnerError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self::new(&RunnerConfig::new(resources, workers), jobs)
    }

    /// Set the worker count to `threads`.
    ///
    /// Runs under the highest lock class. Growing the pool wakes the scheduler,
    /// since new idle workers may unblock pending jobs. This holds for a grow
    /// that fails partway too: the workers spawned before the failure stay.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::ShutDown` after shutdown, or `RunnerError::Spawn`.
    pub fn resize(&self, threads: usize) -> Result<(), RunnerError> {
        let guard = self.shared.state.acquire(LockClass::Resize);
        let before = self.shared.pool.size();
        let result = self.shared.pool.resize(threads);
        let grew = self.shared.pool.size() > before;
        if grew {
            self.shared.wake.notify();
        }
        guard.release();
        debug!(threads, grew, ok = result.is_ok(), "JobRunner resized");
        result
    }

    /// Logical worker count.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.shared.pool.size()
    }

    /// Snapshot of the runner, taken under the scheduling lock class.
    #[must_use]
    pub fn stats(&self) -> RunnerStats {
        let state = self.shared.state.acquire(LockClass::Scheduling);
        self.shared.stats(&state)
    }

    /// Block until every job has been admitted and its resources recovered.
    ///
    /// Returns `false` if `timeout` elapsed first.
    #[must_use]
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.drained.wait_timeout(timeout)
    }

    /// Whether the scheduler thread has exited.
    #[must_use]
    pub fn scheduler_finished(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Stop the scheduler, stop every worker and join all threads.
    ///
    /// Jobs already running finish; admitted jobs still queued are dropped.
    pub fn shutdown(&self) {
        self.shared.wake.shutdown();
        if let Some(handle) = self.scheduler.lock().take() {
            if handle.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
        self.shared.pool.shutdown();
        info!("JobRunner shut down");
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        // Queued tasks hold the shared state; detaching the pool drops them.
        self.shared.wake.shutdown();
        if self.shared.pool.detach() {
            debug!("JobRunner dropped without explicit shutdown - threads will be detached");
        }
    }
}
