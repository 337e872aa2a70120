use crate::cancel::StopRegistration;
use crate::error::Result;
use crate::reactor::TimerGuard;

use super::SideEffect;

use parking_lot::Mutex;

use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

struct Slot<T> {
    outcome: Option<Result<T>>,
    waker: Option<Waker>,
}

/// State shared by the awaiting task and the three resolution branches.
///
/// `resolved` is the only arbiter: a branch must win [`claim`](Self::claim)
/// before touching the outcome.
pub(super) struct Shared<T> {
    resolved: AtomicBool,
    slot: Mutex<Slot<T>>,
    timer: Mutex<Option<TimerGuard>>,
    registration: Mutex<Option<StopRegistration>>,
    on_success: Mutex<Option<SideEffect<T>>>,
}

impl<T> Shared<T> {
    pub(super) fn new(waker: Waker, on_success: Option<SideEffect<T>>) -> Self {
        Self {
            resolved: AtomicBool::new(false),
            slot: Mutex::new(Slot {
                outcome: None,
                waker: Some(waker),
            }),
            timer: Mutex::new(None),
            registration: Mutex::new(None),
            on_success: Mutex::new(on_success),
        }
    }

    /// Atomically marks the operation resolved. Returns `true` for exactly
    /// one caller.
    pub(super) fn claim(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(super) fn is_claimed(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Stores the outcome and wakes the awaiting task. Only the claiming
    /// branch calls this.
    pub(super) fn resume(&self, outcome: Result<T>) {
        let waker = {
            let mut slot = self.slot.lock();
            slot.outcome = Some(outcome);
            slot.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    pub(super) fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<Result<T>> {
        let mut slot = self.slot.lock();

        match slot.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                match &mut slot.waker {
                    Some(waker) if waker.will_wake(cx.waker()) => {}
                    waker => *waker = Some(cx.waker().clone()),
                }
                Poll::Pending
            }
        }
    }

    pub(super) fn run_side_effect(&self, value: &mut T) {
        let side_effect = self.on_success.lock().take();

        if let Some(f) = side_effect {
            f(value);
        }
    }

    pub(super) fn set_timer(&self, guard: TimerGuard) {
        if self.is_claimed() {
            guard.cancel();
        }
        *self.timer.lock() = Some(guard);
    }

    pub(super) fn cancel_timer(&self) {
        if let Some(guard) = self.timer.lock().take() {
            guard.cancel();
        }
    }

    pub(super) fn set_registration(&self, registration: StopRegistration) {
        if self.is_claimed() {
            return;
        }
        *self.registration.lock() = Some(registration);
    }

    pub(super) fn deregister(&self) {
        // Dropped outside the lock: unsubscribing takes the source's lock.
        let registration = self.registration.lock().take();
        drop(registration);
    }
}
