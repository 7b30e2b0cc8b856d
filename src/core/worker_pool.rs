//! Resizable pool of dedicated worker threads.
//!
//! Workers consume one shared FIFO queue. The pool can grow or shrink at any
//! time; shrinking signals the oldest workers to stop, and each stops after
//! finishing whatever task it is currently running.
//!
//! # Key Features
//!
//! - **Logical membership**: `size()` drops the moment a worker is told to
//!   stop, not when its thread exits
//! - **Fire-and-forget or blocking**: `submit` vs `invoke_and_wait`
//! - **Panic isolation**: a panicking task is logged and its worker survives
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use prometheus_job_runner::config::WorkerPoolConfig;
//! use prometheus_job_runner::core::WorkerPool;
//!
//! let pool = WorkerPool::new(&WorkerPoolConfig::new().with_worker_count(2)).unwrap();
//! let answer = pool.invoke_and_wait(|| 6 * 7, Duration::from_secs(5)).unwrap();
//! assert_eq!(answer, 42);
//!
//! pool.resize(0).unwrap();
//! assert_eq!(pool.size(), 0);
//! pool.shutdown();
//! ```

mod worker;

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::error::{InvocationError, RunnerError};

use worker::{spawn_worker, WorkerContext};

/// A unit of work executed by a pool worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Logical number of workers.
    pub worker_count: usize,
    /// Tasks currently executing.
    pub active_tasks: u64,
    /// Tasks waiting in the queue.
    pub queued_tasks: u64,
    /// Tasks that returned normally.
    pub completed_tasks: u64,
    /// Tasks that panicked.
    pub failed_tasks: u64,
    /// Tasks ever accepted by `submit`.
    pub submitted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, queued_tasks: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: queued_tasks as u64,
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// Shared FIFO queue. `closed` rejects further submissions.
#[derive(Default)]
pub(crate) struct TaskQueue {
    pub tasks: VecDeque<Task>,
    pub closed: bool,
}

/// State shared between the pool handle and its worker threads.
pub(crate) struct PoolShared {
    pub queue: Mutex<TaskQueue>,
    pub task_ready: Condvar,
    pub counters: PoolCounters,
}

/// Handle on one live worker.
struct WorkerHandle {
    id: usize,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Worker membership. `active` is ordered oldest first.
#[derive(Default)]
struct Workers {
    active: VecDeque<WorkerHandle>,
    retired: Vec<JoinHandle<()>>,
}

/// Resizable worker pool with a shared FIFO task queue.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    shared: Arc<PoolShared>,
    workers: Mutex<Workers>,
    next_worker_id: AtomicUsize,
    shutdown: AtomicBool,
    /// Spawns with an id at or above this fail (test-only fault injection).
    #[cfg(test)]
    spawn_limit: AtomicUsize,
}

impl WorkerPool {
    /// Create a pool and start `config.worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::InvalidConfig` for an invalid configuration and
    /// `RunnerError::Spawn` if a thread cannot be started.
    pub fn new(config: &WorkerPoolConfig) -> Result<Self, RunnerError> {
        config.validate().map_err(RunnerError::InvalidConfig)?;

        let pool = Self {
            config: config.clone(),
            shared: Arc::new(PoolShared {
                queue: Mutex::new(TaskQueue::default()),
                task_ready: Condvar::new(),
                counters: PoolCounters::default(),
            }),
            workers: Mutex::new(Workers::default()),
            next_worker_id: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            #[cfg(test)]
            spawn_limit: AtomicUsize::new(usize::MAX),
        };
        pool.resize(config.worker_count)?;

        info!(
            pool = %config.thread_name_prefix,
            worker_count = config.worker_count,
            "WorkerPool initialized"
        );
        Ok(pool)
    }

    /// Logical number of workers (stopped workers are excluded immediately).
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.lock().active.len()
    }

    /// Grow or shrink the pool to exactly `target` workers.
    ///
    /// Growing starts new idle workers. Shrinking signals the oldest workers
    /// to stop; each exits once its current task (if any) completes and never
    /// pulls another task.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::ShutDown` after `shutdown()`, or
    /// `RunnerError::Spawn` if a thread cannot be started (workers spawned
    /// before the failure are kept).
    pub fn resize(&self, target: usize) -> Result<(), RunnerError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(RunnerError::ShutDown);
        }

        let mut workers = self.workers.lock();
        // shutdown() may have drained `active` between the check above and the lock.
        if self.shutdown.load(Ordering::Acquire) {
            return Err(RunnerError::ShutDown);
        }
        workers.retired.retain(|thread| !thread.is_finished());
        let current = workers.active.len();

        if target >= current {
            for _ in current..target {
                let handle = self.spawn()?;
                workers.active.push_back(handle);
            }
        } else {
            for _ in target..current {
                if let Some(handle) = workers.active.pop_front() {
                    self.signal_stop(&handle);
                    workers.retired.push(handle.thread);
                }
            }
        }

        debug!(from = current, to = target, "WorkerPool resized");
        Ok(())
    }

    /// Queue a task and wake one idle worker (fire-and-forget).
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::ShutDown` if the pool no longer accepts work.
    pub fn submit<F>(&self, work: F) -> Result<(), RunnerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        if queue.closed {
            return Err(RunnerError::ShutDown);
        }
        queue.tasks.push_back(Box::new(work));
        drop(queue);

        self.shared.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        self.shared.task_ready.notify_one();
        Ok(())
    }

    /// Run `work` on the pool and block until it completes or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - `InvocationError::Panicked` if `work` panicked
    /// - `InvocationError::Timeout` if the deadline elapsed first
    /// - `InvocationError::Interrupted` if the pool discarded the work
    /// - `InvocationError::ShutDown` if the pool was already shut down
    pub fn invoke_and_wait<F, R>(&self, work: F, timeout: Duration) -> Result<R, InvocationError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.invoke(work)?.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(InvocationError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(InvocationError::Interrupted),
        }
    }

    /// Run `work` on the pool and block, without a deadline, until it completes.
    ///
    /// # Errors
    ///
    /// Same as [`invoke_and_wait`](Self::invoke_and_wait), minus `Timeout`.
    pub fn invoke_and_wait_uninterruptible<F, R>(&self, work: F) -> Result<R, InvocationError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.invoke(work)?
            .recv()
            .unwrap_or(Err(InvocationError::Interrupted))
    }

    /// Run `work` on the pool and await its completion without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Same as [`invoke_and_wait_uninterruptible`](Self::invoke_and_wait_uninterruptible).
    #[cfg(feature = "tokio-runtime")]
    pub async fn invoke_async<F, R>(&self, work: F) -> Result<R, InvocationError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.submit(move || {
            let _ = tx.send(run_caught(work));
        })
        .map_err(|_| InvocationError::ShutDown)?;
        rx.await.unwrap_or(Err(InvocationError::Interrupted))
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let queued = self.shared.queue.lock().tasks.len();
        self.shared.counters.snapshot(self.size(), queued)
    }

    /// Stop every worker, discard queued tasks and join all threads.
    ///
    /// Tasks already running finish first. Blocked invokers of discarded tasks
    /// receive `InvocationError::Interrupted`.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(pool = %self.config.thread_name_prefix, "Shutting down worker pool");
        let dropped = self.close();
        if dropped > 0 {
            warn!(dropped, "discarded queued tasks at shutdown");
        }

        let threads: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock();
            let active: Vec<WorkerHandle> = workers.active.drain(..).collect();
            for handle in &active {
                self.signal_stop(handle);
            }
            let mut threads: Vec<JoinHandle<()>> = workers.retired.drain(..).collect();
            threads.extend(active.into_iter().map(|handle| handle.thread));
            threads
        };

        let count = threads.len();
        for thread in threads {
            if thread.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        info!(joined = count, "Worker pool shut down complete");
    }

    fn invoke<F, R>(&self, work: F) -> Result<Receiver<Result<R, InvocationError>>, InvocationError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        self.submit(move || {
            let _ = tx.send(run_caught(work));
        })
        .map_err(|_| InvocationError::ShutDown)?;
        Ok(rx)
    }

    /// Live workers whose thread is not in `busy`.
    ///
    /// Threads of stopped workers are ignored, so a job still running on a
    /// worker removed by a shrink does not hide an idle live worker.
    pub(crate) fn free_members<'a, I>(&self, busy: I) -> usize
    where
        I: IntoIterator<Item = &'a ThreadId>,
    {
        let workers = self.workers.lock();
        let busy_members = busy
            .into_iter()
            .filter(|thread| workers.active.iter().any(|w| w.thread.thread().id() == **thread))
            .count();
        workers.active.len().saturating_sub(busy_members)
    }

    /// Whether `thread` belongs to a live (not stopped) worker.
    pub(crate) fn is_member(&self, thread: ThreadId) -> bool {
        self.workers
            .lock()
            .active
            .iter()
            .any(|w| w.thread.thread().id() == thread)
    }

    #[cfg(test)]
    pub(crate) fn set_spawn_limit(&self, limit: usize) {
        self.spawn_limit.store(limit, Ordering::Relaxed);
    }

    fn spawn(&self) -> Result<WorkerHandle, RunnerError> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        #[cfg(test)]
        if id >= self.spawn_limit.load(Ordering::Relaxed) {
            return Err(std::io::Error::other("spawn limit reached").into());
        }
        let stop = Arc::new(AtomicBool::new(false));
        let thread = spawn_worker(
            WorkerContext {
                id,
                shared: Arc::clone(&self.shared),
                stop: Arc::clone(&stop),
            },
            &self.config,
        )?;
        Ok(WorkerHandle { id, stop, thread })
    }

    /// Flag set under the queue lock so an idle worker cannot miss the wake-up.
    fn signal_stop(&self, handle: &WorkerHandle) {
        let queue = self.shared.queue.lock();
        handle.stop.store(true, Ordering::Release);
        drop(queue);
        self.shared.task_ready.notify_all();
        debug!(worker_id = handle.id, "Worker signalled to stop");
    }

    /// Reject further submissions and drop queued tasks, returning how many.
    fn close(&self) -> usize {
        let dropped: Vec<Task> = {
            let mut queue = self.shared.queue.lock();
            queue.closed = true;
            queue.tasks.drain(..).collect()
        };
        dropped.len()
    }

    /// Signal shutdown without joining: queued tasks are dropped and workers
    /// exit after their current task. Returns `false` if already shut down.
    pub(crate) fn detach(&self) -> bool {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.close();
        let workers = self.workers.lock();
        for handle in &workers.active {
            self.signal_stop(handle);
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Don't join here; explicit shutdown() is required for graceful cleanup.
        if self.detach() {
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

/// Run `work`, converting a panic into `InvocationError::Panicked`.
fn run_caught<F, R>(work: F) -> Result<R, InvocationError>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(work))
        .map_err(|payload| InvocationError::Panicked(panic_message(payload.as_ref())))
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}
