use parking_lot::Mutex;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicBool};
use std::task::Waker;
use std::time::Instant;

/// What happens when a timer reaches its deadline.
pub(crate) enum Expiry {
    /// Wake a suspended task (used by [`Sleep`](crate::time::Sleep)).
    Wake(Waker),

    /// Run a callback on the reactor thread (used by operation awaiters).
    Call(Box<dyn FnOnce() + Send>),
}

impl Expiry {
    pub(crate) fn fire(self) {
        match self {
            Expiry::Wake(waker) => waker.wake(),
            Expiry::Call(callback) => callback(),
        }
    }
}

/// State shared by a timer's owner and its heap entry.
///
/// Cancelling takes the expiry out of the slot, so whatever it captured is
/// released immediately rather than at the deadline.
pub(crate) struct TimerState {
    cancelled: AtomicBool,
    expiry: Mutex<Option<Expiry>>,
}

impl TimerState {
    pub(crate) fn new(expiry: Expiry) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            expiry: Mutex::new(Some(expiry)),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(atomic::Ordering::Acquire)
    }

    /// Takes the expiry for firing. `None` once cancelled or already fired.
    pub(crate) fn take(&self) -> Option<Expiry> {
        self.expiry.lock().take()
    }
}

/// An entry in the reactor timer heap, ordered by deadline.
pub(crate) struct TimerEntry {
    pub(crate) deadline: Instant,
    pub(crate) state: Arc<TimerState>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline)
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest deadline.
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owner's side of a scheduled timer.
///
/// Dropping the guard does **not** cancel the timer; call [`cancel`](Self::cancel).
pub struct TimerGuard {
    pub(crate) state: Arc<TimerState>,
}

impl TimerGuard {
    /// Prevents the timer from firing, if it has not fired yet, and drops
    /// its pending action.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, atomic::Ordering::Release);

        // Dropped outside the lock: the action may own arbitrary state.
        let expiry = self.state.take();
        drop(expiry);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
