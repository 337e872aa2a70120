use super::core::RawTask;
use super::state::COMPLETED;
use crate::error::Fault;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// A handle to a spawned task.
///
/// A `JoinHandle` implements [`Future`] and resolves once the task has
/// completed, with its value or with the [`Fault`] it panicked with.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    /// Shared reference to the underlying task.
    pub(crate) task: Arc<RawTask<T>>,
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has produced its outcome.
    pub fn is_finished(&self) -> bool {
        self.task.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Takes the outcome if the task has completed.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was already taken.
    pub(crate) fn try_take(&self) -> Option<Result<T, Fault>> {
        if !self.is_finished() {
            return None;
        }

        // Safety: COMPLETED was published after the result was written, and the
        // handle is the only reader.
        let outcome = unsafe { (*self.task.result.get()).take() };
        Some(outcome.expect("task result already taken"))
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T, Fault>;

    /// Polls the join handle.
    ///
    /// The waker is registered **before** re-checking the task state
    /// to avoid missed wake-ups.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.try_take() {
            return Poll::Ready(outcome);
        }

        {
            let mut waiters = self.task.waiters.lock();
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        if let Some(outcome) = self.try_take() {
            return Poll::Ready(outcome);
        }

        Poll::Pending
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}
