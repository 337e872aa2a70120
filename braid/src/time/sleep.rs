use crate::reactor::{Expiry, TimerGuard, TimerHandle};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Creates a future that completes after the given duration.
///
/// The returned sleep future registers a timer with the current
/// runtime reactor and completes once the duration has elapsed.
///
/// # Panics
///
/// Panics if polled outside of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(duration)
}

/// A future that completes once a specific deadline is reached.
///
/// `Sleep` registers a timer with the reactor on first poll. The timer is
/// cancelled if the future is dropped before completion, so dropping a
/// sleep never causes a spurious wake-up.
pub struct Sleep {
    /// Absolute point in time when the sleep completes; `None` when the
    /// duration overflows `Instant`, in which case it never completes.
    deadline: Option<Instant>,

    /// Reactor timer and the waker it was registered with.
    timer: Option<(TimerGuard, Waker)>,
}

impl Sleep {
    /// Creates a new `Sleep` future that completes after `duration`.
    ///
    /// The timer is not registered until the future is first polled.
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(duration),
            timer: None,
        }
    }

    /// The instant at which this sleep completes, if it is representable.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(deadline) = this.deadline else {
            return Poll::Pending;
        };

        if Instant::now() >= deadline {
            return Poll::Ready(());
        }

        // Re-arm when polled by a different task than the one registered.
        match &this.timer {
            Some((_, waker)) if waker.will_wake(cx.waker()) => {}
            _ => {
                if let Some((guard, _)) = this.timer.take() {
                    guard.cancel();
                }

                let reactor = TimerHandle::current().expect("Sleep polled outside of runtime");
                let waker = cx.waker().clone();
                let guard = reactor.set_timer(deadline, Expiry::Wake(waker.clone()));
                this.timer = Some((guard, waker));
            }
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some((guard, _)) = &self.timer {
            guard.cancel();
        }
    }
}
