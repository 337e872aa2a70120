//! Bridging callback-driven collaborators into tasks.
//!
//! An [`Operation`] wraps one asynchronous step of a [`Collaborator`]: an
//! object (socket, resolver, transfer handle, ...) that accepts an initiation
//! request and later invokes a completion callback exactly once, possibly on
//! another thread.
//!
//! While the task awaiting the operation is suspended, up to three branches
//! race to resolve it:
//!
//! 1. the collaborator's completion,
//! 2. an optional timeout scheduled on the reactor,
//! 3. an optional stop request on the task's stop source.
//!
//! All three share a single atomic flag. Only the branch that flips it from
//! unset to set may store an outcome and wake the task; the others become
//! no-ops. When the timer or the stop request wins, the collaborator is asked
//! to [`cancel`](Collaborator::cancel) and the operation resolves with
//! [`Error::Timeout`] or [`Error::Aborted`] even if the collaborator reports
//! success a moment later.
//!
//! # Examples
//!
//! ```rust,ignore
//! let n = operation(socket.clone(), |socket, done| {
//!     socket.start_read(buf, move |res| done.complete(res))
//! })
//! .timeout(Duration::from_secs(5))
//! .cancellable()
//! .await?;
//! ```

mod shared;

use shared::Shared;

use crate::cancel::StopSource;
use crate::error::{Error, Result};
use crate::reactor::TimerHandle;
use crate::runtime::context;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// An external object driving an [`Operation`].
pub trait Collaborator: Send + Sync + 'static {
    /// Best-effort, thread-safe, idempotent request to abort whatever is in
    /// flight. May be a no-op if the operation already completed.
    fn cancel(&self);

    /// The reactor co-located with this collaborator.
    ///
    /// Defaults to `None`, in which case the timer of the runtime polling the
    /// operation is used.
    fn timer(&self) -> Option<TimerHandle> {
        None
    }
}

/// The completion handler handed to the initiation closure.
///
/// Consuming `self` makes "invoked exactly once" a property of the type.
/// Dropping it without completing leaves the operation to the timeout or
/// stop branches.
pub struct Completion<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Completion<T> {
    /// Reports the collaborator's outcome.
    ///
    /// An [`Error::Aborted`] outcome is ignored: it can only be the echo of a
    /// `cancel()` issued by a branch that already resolved the operation.
    pub fn complete<E>(self, outcome: std::result::Result<T, E>)
    where
        E: Into<Error>,
    {
        let outcome = outcome.map_err(Into::into);

        if matches!(outcome, Err(Error::Aborted)) {
            tracing::trace!("ignoring aborted completion");
            return;
        }

        let shared = self.shared;

        if !shared.claim() {
            tracing::trace!("completion lost the race");
            return;
        }

        shared.cancel_timer();
        shared.deregister();

        let outcome = match outcome {
            Ok(mut value) => {
                shared.run_side_effect(&mut value);
                Ok(value)
            }
            Err(err) => Err(err),
        };

        tracing::trace!(ok = outcome.is_ok(), "operation completed");
        shared.resume(outcome);
    }

    /// Shorthand for `complete(Ok(value))`.
    pub fn succeed(self, value: T) {
        self.complete(Ok::<T, Error>(value));
    }

    /// Shorthand for `complete(Err(error))`.
    pub fn fail(self, error: impl Into<Error>) {
        self.complete(Err::<T, Error>(error.into()));
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.shared.is_claimed())
            .finish()
    }
}

/// Creates an awaiter for one asynchronous step of `collaborator`.
///
/// `initiate` runs once, when the awaiting task first suspends on the
/// operation. It must pass the [`Completion`] on to the collaborator, which
/// invokes it when done, either synchronously or later from any thread.
///
/// Without further configuration the operation never times out and ignores
/// stop requests.
pub fn operation<C, T, I>(collaborator: Arc<C>, initiate: I) -> Operation<C, T, I>
where
    C: Collaborator + ?Sized,
    T: Send + 'static,
    I: FnOnce(&C, Completion<T>),
{
    Operation {
        collaborator,
        initiate: Some(initiate),
        timeout: None,
        cancellable: false,
        on_success: None,
        shared: None,
    }
}

type SideEffect<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Future returned by [`operation`]. Resolves with [`Result<T>`].
#[must_use = "operations do nothing unless awaited"]
pub struct Operation<C: Collaborator + ?Sized, T, I> {
    collaborator: Arc<C>,
    initiate: Option<I>,
    timeout: Option<Duration>,
    cancellable: bool,
    on_success: Option<SideEffect<T>>,
    shared: Option<Arc<Shared<T>>>,
}

impl<C, T, I> Operation<C, T, I>
where
    C: Collaborator + ?Sized,
    T: Send + 'static,
    I: FnOnce(&C, Completion<T>),
{
    /// Resolves with [`Error::Timeout`] if the collaborator has not completed
    /// within `duration`.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Resolves with [`Error::Aborted`] when a stop is requested on the
    /// awaiting task's stop source.
    pub fn cancellable(self) -> Self {
        self.with_cancellation(true)
    }

    /// Enables or disables the stop branch, as [`cancellable`](Self::cancellable) does.
    pub fn with_cancellation(mut self, enabled: bool) -> Self {
        self.cancellable = enabled;
        self
    }

    /// Runs `f` on a successful result before it is stored, on the thread
    /// that completes the operation.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    /// First suspension: wires up the three branches.
    fn arm(&mut self, initiate: I, cx: &mut Context<'_>) -> Arc<Shared<T>> {
        let shared = Arc::new(Shared::new(cx.waker().clone(), self.on_success.take()));

        // A null source when cancellation is disabled or no task is running.
        let stop = match self.cancellable {
            true => context::current_stop().unwrap_or_else(StopSource::never),
            false => StopSource::never(),
        };

        if stop.stop_requested() {
            tracing::trace!("stop requested before initiation");
            shared.claim();
            shared.resume(Err(Error::Aborted));
            return shared;
        }

        initiate(
            &self.collaborator,
            Completion {
                shared: shared.clone(),
            },
        );

        if shared.is_claimed() {
            // Completed synchronously during initiation.
            return shared;
        }

        // A deadline past what `Instant` can represent never fires.
        let deadline = self
            .timeout
            .and_then(|duration| Instant::now().checked_add(duration));

        if let Some(deadline) = deadline {
            let timer = self
                .collaborator
                .timer()
                .or_else(TimerHandle::current)
                .expect("operation timeout requires a runtime timer");

            let branch = shared.clone();
            let collaborator = self.collaborator.clone();

            let guard = timer.schedule(deadline, move || {
                if !branch.claim() {
                    return;
                }

                tracing::trace!("operation timed out");
                branch.deregister();
                collaborator.cancel();
                branch.resume(Err(Error::Timeout));
            });

            shared.set_timer(guard);
        }

        if stop.stop_possible() {
            let branch = shared.clone();
            let collaborator = self.collaborator.clone();

            let registration = stop.token().register(move || {
                if !branch.claim() {
                    return;
                }

                tracing::trace!("operation aborted by stop request");
                branch.cancel_timer();
                collaborator.cancel();
                branch.resume(Err(Error::Aborted));
            });

            shared.set_registration(registration);
        }

        shared
    }
}

// Nothing is pinned in place: the closure is moved out before it runs.
impl<C: Collaborator + ?Sized, T, I> Unpin for Operation<C, T, I> {}

impl<C, T, I> Future for Operation<C, T, I>
where
    C: Collaborator + ?Sized,
    T: Send + 'static,
    I: FnOnce(&C, Completion<T>),
{
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T>> {
        let this = self.get_mut();

        let shared = match this.shared.clone() {
            Some(shared) => shared,
            None => {
                let Some(initiate) = this.initiate.take() else {
                    panic!("operation polled after completion");
                };

                let shared = this.arm(initiate, cx);
                this.shared = Some(shared.clone());
                shared
            }
        };

        match shared.poll_outcome(cx) {
            Poll::Ready(outcome) => {
                // A guard installed after a synchronous race may still be
                // armed; release it now.
                shared.cancel_timer();
                shared.deregister();
                this.shared = None;
                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<C: Collaborator + ?Sized, T, I> Drop for Operation<C, T, I> {
    /// Abandons an in-flight operation: late branches become no-ops and the
    /// collaborator is asked to stop.
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };

        if shared.claim() {
            tracing::trace!("operation dropped while in flight");
            shared.cancel_timer();
            shared.deregister();
            self.collaborator.cancel();
        }
    }
}

impl<C: Collaborator + ?Sized, T, I> fmt::Debug for Operation<C, T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("timeout", &self.timeout)
            .field("cancellable", &self.cancellable)
            .field("initiated", &self.shared.is_some())
            .finish()
    }
}
