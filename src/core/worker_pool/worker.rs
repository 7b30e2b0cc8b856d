//! Worker thread loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::config::WorkerPoolConfig;

use super::{panic_message, PoolShared, Task};

/// Everything a worker thread owns.
pub(super) struct WorkerContext {
    pub id: usize,
    pub shared: Arc<PoolShared>,
    pub stop: Arc<AtomicBool>,
}

impl WorkerContext {
    /// Block until a task is queued or this worker is stopped.
    ///
    /// The stop flag is checked before every pull, so a stopped worker never
    /// takes another task even if the queue is non-empty.
    fn next_task(&self) -> Option<Task> {
        let mut queue = self.shared.queue.lock();
        loop {
            if self.stop.load(Ordering::Acquire) {
                // A submit may have woken us instead of a live worker; pass it on.
                if !queue.tasks.is_empty() {
                    self.shared.task_ready.notify_one();
                }
                return None;
            }
            if let Some(task) = queue.tasks.pop_front() {
                return Some(task);
            }
            self.shared.task_ready.wait(&mut queue);
        }
    }

    fn run(&self) {
        debug!(worker_id = self.id, "Worker thread started");

        while let Some(task) = self.next_task() {
            let counters = &self.shared.counters;
            counters.active_tasks.fetch_add(1, Ordering::Relaxed);

            match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(()) => {
                    counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                }
                Err(payload) => {
                    counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                    error!(
                        worker_id = self.id,
                        panic = %panic_message(payload.as_ref()),
                        "Worker task panicked"
                    );
                }
            }

            counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
        }

        debug!(worker_id = self.id, "Worker thread exiting");
    }
}

/// Spawn a named worker thread.
pub(super) fn spawn_worker(
    ctx: WorkerContext,
    config: &WorkerPoolConfig,
) -> std::io::Result<JoinHandle<()>> {
    let mut builder =
        thread::Builder::new().name(format!("{}-worker-{}", config.thread_name_prefix, ctx.id));
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }
    builder.spawn(move || ctx.run())
}
