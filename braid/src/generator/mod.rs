//! Lazy, finite, non-restartable sequences.
//!
//! A [`Generator`] owns a suspended producer body and a single-slot buffer.
//! Each call to [`next`](Generator::next) resumes the body until it either
//! yields a value through its [`Co`] handle or returns. Nothing runs before
//! the first `next()`, and once the body has returned every further call
//! reports exhaustion.
//!
//! ```rust,ignore
//! let mut numbers = Generator::new(|co| async move {
//!     for i in 1..=3 {
//!         co.yield_(i).await;
//!     }
//! });
//!
//! while let Some(n) = numbers.next().await {
//!     println!("{n}");
//! }
//! ```

use crate::error::Fault;

use parking_lot::Mutex;

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

type Slot<T> = Arc<Mutex<Option<T>>>;
type Body<R> = Pin<Box<dyn Future<Output = R> + Send>>;

/// The producer's side of a [`Generator`].
pub struct Co<T> {
    slot: Slot<T>,
}

impl<T> Co<T> {
    /// Hands `value` to the consumer and parks the producer until the next
    /// `next()` call.
    pub fn yield_(&self, value: T) -> Yield<'_, T> {
        Yield {
            co: self,
            value: Some(value),
        }
    }
}

impl<T> fmt::Debug for Co<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Co").finish_non_exhaustive()
    }
}

/// Future returned by [`Co::yield_`].
#[must_use = "a yielded value is only delivered when awaited"]
pub struct Yield<'a, T> {
    co: &'a Co<T>,
    value: Option<T>,
}

impl<T> Unpin for Yield<'_, T> {}

impl<T> Future for Yield<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        match this.value.take() {
            // The consumer drives the next poll; no wake-up needed.
            Some(value) => {
                *this.co.slot.lock() = Some(value);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

/// A producer of values of type `T` that finishes with a value of type `R`.
pub struct Generator<T, R = ()> {
    slot: Slot<T>,
    body: Option<Body<R>>,
    terminal: Option<Result<R, Fault>>,
    exhausted: bool,
}

impl<T, R> Generator<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Creates a generator from a producer. `producer` is called right away to
    /// build the body, but the body itself does not run until the first
    /// `next()`.
    pub fn new<P, F>(producer: P) -> Self
    where
        P: FnOnce(Co<T>) -> F,
        F: Future<Output = R> + Send + 'static,
    {
        let slot: Slot<T> = Arc::new(Mutex::new(None));
        let body = producer(Co { slot: slot.clone() });

        Self {
            slot,
            body: Some(Box::pin(body)),
            terminal: None,
            exhausted: false,
        }
    }
}

impl<T, R> Generator<T, R> {
    /// Resumes the producer until it yields or returns.
    ///
    /// Resolves with `None` once the producer has returned. A panic raised by
    /// the producer is raised again here.
    pub fn next(&mut self) -> Next<'_, T, R> {
        Next {
            generator: self,
            deferred: false,
        }
    }

    /// Like [`next`](Self::next), but a producer panic ends the sequence
    /// instead of unwinding the caller. The fault is raised by
    /// [`finish`](Self::finish).
    pub fn next_deferred(&mut self) -> Next<'_, T, R> {
        Next {
            generator: self,
            deferred: true,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Consumes an exhausted generator, returning the producer's terminal
    /// value or raising its deferred panic.
    ///
    /// # Panics
    ///
    /// Panics if the producer has not returned yet, or if its panic was
    /// already raised by [`next`](Self::next).
    #[track_caller]
    pub fn finish(mut self) -> R {
        assert!(self.exhausted, "generator finished before exhaustion");

        match self.terminal.take() {
            Some(Ok(value)) => value,
            Some(Err(fault)) => fault.resume(),
            None => panic!("generator fault was already raised"),
        }
    }

    fn poll_step(&mut self, deferred: bool, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.exhausted {
            return Poll::Ready(None);
        }

        let Some(body) = self.body.as_mut() else {
            return Poll::Ready(None);
        };

        // The producer runs under the consumer's stop source.
        let polled = panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(cx)));

        match polled {
            Ok(Poll::Pending) => match self.slot.lock().take() {
                Some(value) => Poll::Ready(Some(value)),
                None => Poll::Pending,
            },
            Ok(Poll::Ready(value)) => {
                self.retire(Ok(value));
                Poll::Ready(None)
            }
            Err(payload) => {
                let fault = Fault::new(payload);
                tracing::debug!(%fault, deferred, "generator body panicked");

                if deferred {
                    self.retire(Err(fault));
                    Poll::Ready(None)
                } else {
                    self.retire_silently();
                    fault.resume()
                }
            }
        }
    }

    fn retire(&mut self, terminal: Result<R, Fault>) {
        self.retire_silently();
        self.terminal = Some(terminal);
    }

    fn retire_silently(&mut self) {
        self.body = None;
        self.exhausted = true;
    }
}

impl<T, R> fmt::Debug for Generator<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Generator::next`] and [`Generator::next_deferred`].
#[must_use = "futures do nothing unless awaited"]
pub struct Next<'a, T, R> {
    generator: &'a mut Generator<T, R>,
    deferred: bool,
}

impl<T, R> Future for Next<'_, T, R> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        this.generator.poll_step(this.deferred, cx)
    }
}
