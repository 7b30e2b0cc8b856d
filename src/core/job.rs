//! Job descriptors consumed by the runner.

use std::fmt;
use std::time::Duration;

/// Identifier of a job; its position in the list handed to the runner.
pub type JobId = u64;

pub(crate) type Work = Box<dyn FnOnce() -> Duration + Send + 'static>;

/// A unit of work plus the named resources it needs while running.
///
/// The work function runs exactly once on a pool worker and returns the
/// settle delay: how long the worker keeps the resources' bookkeeping lock
/// after recovering them before it becomes idle again.
///
/// ```
/// use std::time::Duration;
/// use prometheus_job_runner::core::Job;
///
/// let job = Job::new(["cpu", "gpu"], || Duration::from_millis(5));
/// assert_eq!(job.resources(), ["cpu", "gpu"]);
/// ```
pub struct Job {
    resources: Vec<String>,
    work: Work,
}

impl Job {
    /// Create a job from resource names and a work function returning its settle delay.
    pub fn new<I, S, F>(resources: I, work: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce() -> Duration + Send + 'static,
    {
        Self {
            resources: resources.into_iter().map(Into::into).collect(),
            work: Box::new(work),
        }
    }

    /// Create a job whose work function reports its settle delay in milliseconds.
    pub fn with_settle_millis<I, S, F>(resources: I, work: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce() -> u64 + Send + 'static,
    {
        Self::new(resources, move || Duration::from_millis(work()))
    }

    /// Resource names required, in declaration order. Duplicates count once each.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Work) {
        (self.resources, self.work)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}
