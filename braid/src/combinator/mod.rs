//! Fan-out combinators.
//!
//! Each combinator spawns its children concurrently on the runtime of the
//! current thread, tracks them through shared counters, and resumes the
//! awaiting parent exactly once when its aggregate condition holds:
//!
//! - [`until_all`] / [`until_all_settled`]: every child reached a terminal
//!   state. A failing child never interrupts its siblings.
//! - [`until_one`]: the first child succeeded. Losers keep running and their
//!   outcomes are discarded.
//! - [`while_next`]: a generator is exhausted and every per-item task has
//!   reported to the collector.
//!
//! Every child runs under a [child](crate::cancel::StopSource::child) of the
//! parent's stop source, so a stop requested on the parent reaches them all.
//!
//! For children of different output types, see the
//! [`until_all!`](crate::until_all) and
//! [`until_all_settled!`](crate::until_all_settled) macros.

mod until_all;
mod until_one;
mod while_next;

pub use until_all::{until_all, until_all_settled};
pub use until_one::until_one;
pub use while_next::while_next;

use crate::cancel::StopSource;
use crate::error::Fault;
use crate::runtime::context;

use parking_lot::Mutex;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// Countdown shared by a parent and its children.
///
/// Only the child that brings the count to zero wakes the parent.
pub(crate) struct Latch {
    remaining: AtomicUsize,
    waker: Mutex<Option<Waker>>,
}

impl Latch {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            waker: Mutex::new(None),
        }
    }

    /// Counts one child down. Returns `true` for the last one.
    pub(crate) fn arrive(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    pub(crate) fn is_open(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    pub(crate) fn wake(&self) {
        let waker = self.waker.lock().take();

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Parks the parent until `ready` holds. The condition is checked again
    /// after the waker is stored, so a wake-up can not slip in between.
    pub(crate) fn poll_until(&self, cx: &mut Context<'_>, ready: impl Fn() -> bool) -> Poll<()> {
        if ready() {
            return Poll::Ready(());
        }

        *self.waker.lock() = Some(cx.waker().clone());

        match ready() {
            true => Poll::Ready(()),
            false => Poll::Pending,
        }
    }
}

/// The parent's stop source, from which every child source derives.
pub(crate) fn parent_stop() -> StopSource {
    context::current_stop().unwrap_or_else(StopSource::never)
}

/// Raises the lowest-index fault, if any.
#[doc(hidden)]
pub fn raise_first(faults: Vec<Option<Fault>>) {
    if let Some(fault) = faults.into_iter().flatten().next() {
        fault.resume();
    }
}

#[doc(hidden)]
pub type Child = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Output slot of one child of a heterogeneous fan-out. Used by the
/// `until_all!` family of macros.
#[doc(hidden)]
pub struct Slot<T>(Arc<Mutex<Option<T>>>);

impl<T: Send + 'static> Slot<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    /// Erases the output type of `child`; its value lands in this slot.
    pub fn bind<F>(&self, child: F) -> Child
    where
        F: Future<Output = T> + Send + 'static,
    {
        let slot = self.0.clone();

        Box::pin(async move {
            let value = child.await;
            *slot.lock() = Some(value);
        })
    }

    pub fn take(&self) -> Option<T> {
        self.0.lock().take()
    }

    #[track_caller]
    pub fn into_value(self) -> T {
        match self.take() {
            Some(value) => value,
            None => panic!("fan-out child finished without a value"),
        }
    }
}
