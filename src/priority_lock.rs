//! Three-class priority lock.
//!
//! `PriorityLock` is a mutual-exclusion primitive whose acquirers declare one of
//! three [`LockClass`]es. When the lock is released every blocked acquirer
//! re-evaluates the admission rule:
//!
//! - [`LockClass::Resize`] is granted whenever the lock is free.
//! - [`LockClass::Recovery`] is granted when the lock is free and no `Resize`
//!   acquirer is waiting.
//! - [`LockClass::Scheduling`] is granted when the lock is free and no `Resize`
//!   or `Recovery` acquirer is waiting.
//!
//! Lower classes can starve under a continuous stream of higher-class
//! acquirers. The job runner accepts this: resource bookkeeping and pool
//! resizing always cut ahead of a scheduling pass.
//!
//! # Examples
//!
//! ```
//! use prometheus_job_runner::{LockClass, PriorityLock};
//!
//! let lock = PriorityLock::new(Vec::<u32>::new());
//! {
//!     let mut guard = lock.acquire(LockClass::Recovery);
//!     guard.push(7);
//! } // released here
//!
//! let guard = lock.acquire(LockClass::Scheduling);
//! assert_eq!(*guard, vec![7]);
//! guard.release();
//! assert!(!lock.is_locked());
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Priority class of a lock acquirer. `Resize` is the highest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockClass {
    /// Pool resize requests (class 1).
    Resize,
    /// Post-completion resource recovery by workers (class 2).
    Recovery,
    /// Scheduler admission passes (class 3).
    Scheduling,
}

impl LockClass {
    /// All classes, highest priority first.
    pub const ALL: [Self; 3] = [Self::Resize, Self::Recovery, Self::Scheduling];

    /// Numeric class, 1 being the highest priority.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Resize => 1,
            Self::Recovery => 2,
            Self::Scheduling => 3,
        }
    }

    const fn index(self) -> usize {
        self.rank() as usize - 1
    }
}

impl fmt::Display for LockClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resize => "resize",
            Self::Recovery => "recovery",
            Self::Scheduling => "scheduling",
        };
        write!(f, "{name}")
    }
}

/// Ownership flag plus one waiting counter per class.
#[derive(Debug, Default)]
struct GateState {
    held: bool,
    waiting: [usize; 3],
}

impl GateState {
    /// Admission rule: free, and nobody of a strictly higher class is waiting.
    fn admits(&self, class: LockClass) -> bool {
        !self.held && self.waiting[..class.index()].iter().all(|&n| n == 0)
    }
}

/// Gate enforcing the priority admission rule.
#[derive(Debug, Default)]
struct Gate {
    state: Mutex<GateState>,
    released: Condvar,
}

impl Gate {
    fn enter(&self, class: LockClass) {
        let mut state = self.state.lock();
        state.waiting[class.index()] += 1;
        while !state.admits(class) {
            self.released.wait(&mut state);
        }
        state.waiting[class.index()] -= 1;
        state.held = true;
    }

    fn try_enter(&self, class: LockClass) -> bool {
        let mut state = self.state.lock();
        if state.admits(class) {
            state.held = true;
            true
        } else {
            false
        }
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        state.held = false;
        drop(state);
        // Every waiter re-checks: the winner depends on the waiting counters.
        self.released.notify_all();
    }
}

/// Releases the gate when dropped.
struct GateToken<'a> {
    gate: &'a Gate,
}

impl Drop for GateToken<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}

/// A mutual-exclusion lock with three priority classes guarding a value `T`.
///
/// The protected value sits behind an inner `parking_lot::Mutex` that is only
/// ever locked by the current gate holder, so it is never contended.
#[derive(Default)]
pub struct PriorityLock<T> {
    gate: Gate,
    data: Mutex<T>,
}

impl<T> PriorityLock<T> {
    /// Creates a new unlocked lock guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            gate: Gate::default(),
            data: Mutex::new(value),
        }
    }

    /// Blocks until the lock is granted to an acquirer of `class`.
    pub fn acquire(&self, class: LockClass) -> PriorityLockGuard<'_, T> {
        self.gate.enter(class);
        trace!(%class, "Priority lock granted");
        self.guard(class)
    }

    /// Acquires the lock only if the admission rule grants it right now.
    pub fn try_acquire(&self, class: LockClass) -> Option<PriorityLockGuard<'_, T>> {
        self.gate.try_enter(class).then(|| self.guard(class))
    }

    fn guard(&self, class: LockClass) -> PriorityLockGuard<'_, T> {
        PriorityLockGuard {
            data: self.data.lock(),
            _token: GateToken { gate: &self.gate },
            class,
        }
    }

    /// Whether some acquirer currently owns the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.gate.state.lock().held
    }

    /// Number of acquirers of `class` currently blocked.
    #[must_use]
    pub fn waiting(&self, class: LockClass) -> usize {
        self.gate.state.lock().waiting[class.index()]
    }

    /// Consumes the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> fmt::Debug for PriorityLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.gate.state.lock();
        f.debug_struct("PriorityLock")
            .field("held", &state.held)
            .field("waiting", &state.waiting)
            .finish_non_exhaustive()
    }
}

/// RAII ownership of a [`PriorityLock`]. Dropping it releases the lock.
#[must_use = "if unused the PriorityLock will immediately be released"]
pub struct PriorityLockGuard<'a, T> {
    // Field order matters: the data guard drops before the gate is released.
    data: MutexGuard<'a, T>,
    _token: GateToken<'a>,
    class: LockClass,
}

impl<T> PriorityLockGuard<'_, T> {
    /// Class this guard was granted under.
    #[must_use]
    pub const fn class(&self) -> LockClass {
        self.class
    }

    /// Releases the lock. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Deref for PriorityLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for PriorityLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}
