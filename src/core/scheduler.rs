//! Admission control loop.
//!
//! The scheduler thread repeatedly scans the pending list under the
//! [`LockClass::Scheduling`] lock, admits every job it can, and then parks on a
//! latched wake signal until a resize-up or a worker's resource recovery may have
//! changed the picture. It exits for good once the pending list is empty.

use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::job::{Job, JobId, Work};
use crate::core::resources::ResourceTable;
use crate::core::worker_pool::{panic_message, PoolStats, WorkerPool};
use crate::priority_lock::{LockClass, PriorityLock};

/// Shared state for Condvar-based wake notifications.
#[derive(Debug, Default)]
struct WakeState {
    /// Something may have changed since the last pass.
    pending: bool,
    /// The scheduler must exit.
    shutdown: bool,
}

/// Latched wake-up between workers/resizes and the scheduler.
///
/// A notification raised while the scheduler is mid-pass is kept until the
/// next `wait`, so it is never lost.
#[derive(Debug, Default)]
pub(crate) struct WakeSignal {
    state: Mutex<WakeState>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a notification and wake the waiter.
    pub fn notify(&self) {
        self.state.lock().pending = true;
        self.condvar.notify_all();
    }

    /// Ask the waiter to exit.
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.condvar.notify_all();
    }

    /// Block until notified or shut down, consuming the notification.
    ///
    /// Returns `false` once shutdown has been requested.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while !state.pending && !state.shutdown {
            self.condvar.wait(&mut state);
        }
        state.pending = false;
        !state.shutdown
    }

    #[cfg(test)]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }
}

/// One-way flag that wakes everybody waiting for it.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl Completion {
    pub fn set(&self) {
        *self.done.lock() = true;
        self.condvar.notify_all();
    }

    /// Wait up to `timeout`; returns whether the flag was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.condvar.wait_until(&mut done, deadline).timed_out() {
                break;
            }
        }
        *done
    }
}

/// Everything guarded by the runner's priority lock.
#[derive(Debug)]
pub(crate) struct RunnerState {
    pub resources: ResourceTable,
    pub pending: VecDeque<(JobId, Job)>,
    /// Admitted jobs still waiting in the pool queue for a worker.
    pub queued: usize,
    /// Admitted jobs claimed by a worker thread, until that worker is idle again.
    pub running: BTreeMap<JobId, ThreadId>,
    pub completed: u64,
    pub failed: u64,
}

impl RunnerState {
    pub fn new(resources: ResourceTable, pending: VecDeque<(JobId, Job)>) -> Self {
        Self {
            resources,
            pending,
            queued: 0,
            running: BTreeMap::new(),
            completed: 0,
            failed: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.queued + self.running.len()
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight() == 0
    }
}

/// State shared by the runner handle, the scheduler thread and job tasks.
pub(crate) struct Shared {
    pub state: PriorityLock<RunnerState>,
    pub pool: WorkerPool,
    pub wake: WakeSignal,
    pub drained: Completion,
}

/// Point-in-time view of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    /// Worker pool statistics.
    pub pool: PoolStats,
    /// Workers not running a job nor settling one.
    pub idle_workers: usize,
    /// Jobs not yet admitted.
    pub pending_jobs: usize,
    /// Admitted jobs not yet fully recovered.
    pub in_flight_jobs: usize,
    /// Jobs whose work returned normally.
    pub completed_jobs: u64,
    /// Jobs whose work panicked.
    pub failed_jobs: u64,
    /// Free units per resource name.
    pub available: BTreeMap<String, u32>,
}

impl Shared {
    /// Live workers not running or settling a job, less the admitted jobs
    /// still queued for one.
    ///
    /// A job still running on a worker that a shrink stopped does not count
    /// against the live members.
    pub fn idle_workers(&self, state: &RunnerState) -> usize {
        self.pool
            .free_members(state.running.values())
            .saturating_sub(state.queued)
    }

    pub fn stats(&self, state: &RunnerState) -> RunnerStats {
        RunnerStats {
            pool: self.pool.stats(),
            idle_workers: self.idle_workers(state),
            pending_jobs: state.pending.len(),
            in_flight_jobs: state.in_flight(),
            completed_jobs: state.completed,
            failed_jobs: state.failed,
            available: state.resources.snapshot(),
        }
    }
}

/// Scheduler thread body.
pub(crate) fn run(shared: &Arc<Shared>) {
    info!("Scheduler started");
    loop {
        let remaining = admission_pass(shared);
        if remaining == 0 {
            info!("Pending list empty, scheduler exiting");
            break;
        }
        if !shared.wake.wait() {
            info!(pending = remaining, "Scheduler shut down");
            break;
        }
    }
}

/// One scan of the pending list; returns how many jobs are still pending.
///
/// Admission is greedy first-fit in insertion order: a later job may be
/// admitted ahead of an earlier one whose resources are busy.
fn admission_pass(shared: &Arc<Shared>) -> usize {
    let mut state = shared.state.acquire(LockClass::Scheduling);
    let mut idle = shared.idle_workers(&state);
    debug!(idle, pending = state.pending.len(), "Admission pass");

    let mut index = 0;
    while idle > 0 && index < state.pending.len() {
        let admissible = state
            .pending
            .get(index)
            .is_some_and(|(_, job)| state.resources.is_available(job.resources()));
        if !admissible {
            index += 1;
            continue;
        }
        let Some((id, job)) = state.pending.remove(index) else {
            break;
        };
        if let Err(e) = state.resources.reduce(id, job.resources()) {
            error!(job_id = id, error = %e, "Admission check and reservation disagree");
            state.pending.insert(index, (id, job));
            index += 1;
            continue;
        }
        state.queued += 1;

        let (resources, work) = job.into_parts();
        let requirements = resources.clone();
        let task_shared = Arc::clone(shared);
        let dispatch = shared.pool.submit(move || {
            execute(&task_shared, id, &resources, work);
        });
        if let Err(e) = dispatch {
            // Only fails once the pool is shut down; the job is dropped with it.
            warn!(job_id = id, error = %e, "Dispatch rejected");
            state.resources.recover(id, &requirements);
            state.queued -= 1;
            break;
        }
        idle -= 1;
        info!(job_id = id, "Job admitted");
    }

    state.pending.len()
}

/// Worker-side lifecycle of an admitted job.
///
/// The job first claims the current worker thread under
/// [`LockClass::Recovery`], moving itself from queued to running. The work
/// then runs outside the lock. Recovery happens under `Recovery` again, and
/// the settle delay is served while still holding it, so the worker only
/// turns idle after its resources are back. A panicking work function still
/// gets its resources recovered, with no settle delay.
fn execute(shared: &Shared, id: JobId, resources: &[String], work: Work) {
    claim_worker(shared, id);
    debug!(job_id = id, "Job running");
    let outcome = panic::catch_unwind(AssertUnwindSafe(work));

    let mut state = shared.state.acquire(LockClass::Recovery);
    state.resources.recover(id, resources);
    match outcome {
        Ok(settle) => {
            debug!(job_id = id, settle_ms = settle.as_millis(), "Job settling");
            thread::sleep(settle);
            state.completed += 1;
        }
        Err(payload) => {
            error!(job_id = id, panic = %panic_message(payload.as_ref()), "Job panicked");
            state.failed += 1;
        }
    }
    state.running.remove(&id);
    let drained = state.is_drained();
    state.release();

    shared.wake.notify();
    if drained {
        shared.drained.set();
    }
    info!(job_id = id, "Job finished");
}

/// Record which thread runs job `id`.
///
/// If a shrink stopped this worker after it pulled the task, the queued slot
/// the job held was hiding an idle live worker, so the scheduler is woken.
fn claim_worker(shared: &Shared, id: JobId) {
    let thread = thread::current().id();
    let mut state = shared.state.acquire(LockClass::Recovery);
    state.queued -= 1;
    state.running.insert(id, thread);
    state.release();

    if !shared.pool.is_member(thread) {
        debug!(job_id = id, "Job claimed a stopped worker");
        shared.wake.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_signal_latches() {
        let signal = WakeSignal::new();
        signal.notify();
        // Already latched: returns without blocking.
        assert!(signal.wait());
    }

    #[test]
    fn test_wake_signal_shutdown() {
        let signal = Arc::new(WakeSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait())
        };
        thread::sleep(Duration::from_millis(20));
        signal.shutdown();
        assert!(!waiter.join().unwrap());
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_completion_timeout_and_set() {
        let done = Completion::default();
        assert!(!done.wait_timeout(Duration::from_millis(10)));
        done.set();
        assert!(done.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn test_running_jobs_count_as_in_flight() {
        let mut state = RunnerState::new(ResourceTable::default(), VecDeque::new());
        assert!(state.is_drained());
        state.queued = 1;
        state.running.insert(4, thread::current().id());
        assert_eq!(state.in_flight(), 2);
        assert!(!state.is_drained());
    }
}
