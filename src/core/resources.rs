//! Named, finite-capacity resource accounting.

use std::collections::BTreeMap;

use tracing::warn;

use super::error::RunnerError;
use super::job::JobId;

/// Available count per resource name, plus the capacity it started with.
///
/// A job's demand is tallied per name: requiring `"cpu"` twice needs two
/// free `"cpu"` units. Names missing from the table are never available.
/// The table is not synchronised itself; the runner mutates it only while
/// holding its priority lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTable {
    available: BTreeMap<String, u32>,
    capacity: BTreeMap<String, u32>,
}

impl ResourceTable {
    /// Build a table where every resource starts fully available.
    pub fn new<I, S>(capacities: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let capacity: BTreeMap<String, u32> = capacities
            .into_iter()
            .map(|(name, count)| (name.into(), count))
            .collect();
        Self {
            available: capacity.clone(),
            capacity,
        }
    }

    /// Whether every requirement can be satisfied right now.
    #[must_use]
    pub fn is_available(&self, requirements: &[String]) -> bool {
        self.first_shortfall(requirements).is_none()
    }

    /// Reserve one unit per requirement.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::InsufficientResources` (leaving the table
    /// untouched) if any requirement cannot be met.
    pub fn reduce(&mut self, job: JobId, requirements: &[String]) -> Result<(), RunnerError> {
        if let Some(resource) = self.first_shortfall(requirements) {
            return Err(RunnerError::InsufficientResources {
                job,
                resource: resource.to_owned(),
            });
        }
        for name in requirements {
            if let Some(count) = self.available.get_mut(name) {
                *count -= 1;
            }
        }
        Ok(())
    }

    /// Return one unit per requirement.
    ///
    /// Counts never exceed their capacity; an over-recovery is logged and clamped.
    pub fn recover(&mut self, job: JobId, requirements: &[String]) {
        for name in requirements {
            let cap = self.capacity.get(name).copied().unwrap_or(0);
            match self.available.get_mut(name) {
                Some(count) if *count < cap => *count += 1,
                Some(_) => warn!(job_id = job, resource = %name, "recovery would exceed capacity"),
                None => warn!(job_id = job, resource = %name, "recovering unknown resource"),
            }
        }
    }

    /// Units of `name` currently free, or `None` for unknown names.
    #[must_use]
    pub fn available(&self, name: &str) -> Option<u32> {
        self.available.get(name).copied()
    }

    /// Initial capacity of `name`, or `None` for unknown names.
    #[must_use]
    pub fn capacity(&self, name: &str) -> Option<u32> {
        self.capacity.get(name).copied()
    }

    /// Whether every name in `requirements` exists in the table with enough capacity
    /// to ever be satisfied.
    #[must_use]
    pub fn can_ever_satisfy(&self, requirements: &[String]) -> bool {
        tally(requirements)
            .into_iter()
            .all(|(name, demand)| self.capacity(name).is_some_and(|cap| cap >= demand))
    }

    /// Copy of the current available counts.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.available.clone()
    }

    fn first_shortfall<'a>(&self, requirements: &'a [String]) -> Option<&'a str> {
        tally(requirements)
            .into_iter()
            .find(|&(name, demand)| self.available(name).unwrap_or(0) < demand)
            .map(|(name, _)| name)
    }
}

/// Demand per distinct name, preserving first-seen order.
fn tally(requirements: &[String]) -> Vec<(&str, u32)> {
    let mut demand: Vec<(&str, u32)> = Vec::with_capacity(requirements.len());
    for name in requirements {
        match demand.iter_mut().find(|(seen, _)| *seen == name.as_str()) {
            Some((_, count)) => *count += 1,
            None => demand.push((name.as_str(), 1)),
        }
    }
    demand
}
