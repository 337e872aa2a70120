//! Cooperative cancellation.
//!
//! A [`StopSource`] is a one-way, write-once signal. Observers hold a
//! [`StopToken`] and subscribe callbacks with [`StopToken::register`]; each
//! callback runs at most once, on whichever thread requests the stop.
//!
//! Sources form a tree: [`StopSource::child`] creates a source that is stopped
//! whenever its parent is, while a stop requested on the child never travels
//! back up. Tasks use this to inherit the cancellation of the task awaiting them.
//!
//! A source may also be *null* ([`StopSource::never`]), in which case stopping is
//! impossible and registrations are never invoked.

use crate::utils::Slab;

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback = Box<dyn FnOnce() + Send>;

/// Source of unique registration ids, so that a recycled slab slot can never
/// be removed by a stale registration.
static NEXT_REGISTRATION: AtomicU64 = AtomicU64::new(1);

struct Inner {
    requested: AtomicBool,
    callbacks: Mutex<Slab<(u64, Callback)>>,
    /// Keeps a child source subscribed to its parent.
    parent: Mutex<Option<StopRegistration>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            callbacks: Mutex::new(Slab::new(4)),
            parent: Mutex::new(None),
        }
    }

    fn request(&self) -> bool {
        if self.requested.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Drop the lock before running user code: callbacks routinely
        // deregister other callbacks of this same source.
        let callbacks = self.callbacks.lock().drain();

        tracing::trace!(callbacks = callbacks.len(), "stop requested");

        for (_, callback) in callbacks {
            callback();
        }

        self.parent.lock().take();
        true
    }
}

/// The owning side of a cancellation signal.
///
/// Cloning a `StopSource` shares the same signal.
#[derive(Clone)]
pub struct StopSource {
    inner: Option<Arc<Inner>>,
}

impl StopSource {
    /// Creates an active source on which no stop has been requested yet.
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(Inner::new())),
        }
    }

    /// Creates the null source: stopping is impossible.
    pub fn never() -> Self {
        Self { inner: None }
    }

    /// Creates a source that is stopped whenever `self` is.
    ///
    /// Requesting a stop on the returned source does not affect `self`.
    /// The child of a null source is null.
    pub fn child(&self) -> StopSource {
        let Some(parent) = &self.inner else {
            return StopSource::never();
        };

        let child = Arc::new(Inner::new());
        let weak = Arc::downgrade(&child);

        let registration = StopToken {
            inner: Some(parent.clone()),
        }
        .register(move || {
            if let Some(child) = weak.upgrade() {
                child.request();
            }
        });

        // The parent may already have been stopped, in which case the callback
        // above has run and the child is stopped too.
        if !child.requested.load(Ordering::Acquire) {
            *child.parent.lock() = Some(registration);
        }

        StopSource { inner: Some(child) }
    }

    /// Requests a stop, invoking every registered callback.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// later calls, and calls on a null source, return `false`.
    pub fn request_stop(&self) -> bool {
        match &self.inner {
            Some(inner) => inner.request(),
            None => false,
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.requested.load(Ordering::Acquire))
    }

    /// `false` for the null source.
    pub fn stop_possible(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns an observer of this source.
    pub fn token(&self) -> StopToken {
        StopToken {
            inner: self.inner.clone(),
        }
    }
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StopSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopSource")
            .field("possible", &self.stop_possible())
            .field("requested", &self.stop_requested())
            .finish()
    }
}

/// The observing side of a [`StopSource`].
#[derive(Clone)]
pub struct StopToken {
    inner: Option<Arc<Inner>>,
}

impl StopToken {
    pub fn stop_requested(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.requested.load(Ordering::Acquire))
    }

    pub fn stop_possible(&self) -> bool {
        self.inner.is_some()
    }

    /// Subscribes `callback` to the stop request.
    ///
    /// If the stop was already requested, `callback` runs immediately on the
    /// current thread. On a null token it is dropped without running.
    /// Dropping the returned registration unsubscribes it.
    pub fn register<F>(&self, callback: F) -> StopRegistration
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(inner) = &self.inner else {
            return StopRegistration::empty();
        };

        let mut callbacks = inner.callbacks.lock();

        if inner.requested.load(Ordering::Acquire) {
            drop(callbacks);
            callback();
            return StopRegistration::empty();
        }

        let id = NEXT_REGISTRATION.fetch_add(1, Ordering::Relaxed);
        let key = callbacks.insert((id, Box::new(callback)));

        StopRegistration {
            source: Arc::downgrade(inner),
            key,
            id,
        }
    }
}

impl fmt::Debug for StopToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopToken")
            .field("possible", &self.stop_possible())
            .field("requested", &self.stop_requested())
            .finish()
    }
}

/// A live subscription to a stop request. Unsubscribes on drop.
pub struct StopRegistration {
    source: Weak<Inner>,
    key: usize,
    id: u64,
}

impl StopRegistration {
    fn empty() -> Self {
        Self {
            source: Weak::new(),
            key: 0,
            id: 0,
        }
    }

    /// `true` while the callback is still waiting for a stop request.
    pub fn is_armed(&self) -> bool {
        let Some(inner) = self.source.upgrade() else {
            return false;
        };

        inner
            .callbacks
            .lock()
            .get(self.key)
            .is_some_and(|(id, _)| *id == self.id)
    }
}

impl Drop for StopRegistration {
    fn drop(&mut self) {
        let Some(inner) = self.source.upgrade() else {
            return;
        };

        let removed = {
            let mut callbacks = inner.callbacks.lock();

            if callbacks.get(self.key).is_some_and(|(id, _)| *id == self.id) {
                callbacks.remove(self.key)
            } else {
                None
            }
        };

        // The callback may own other registrations; drop it outside the lock.
        drop(removed);
    }
}

impl fmt::Debug for StopRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopRegistration")
            .field("armed", &self.is_armed())
            .finish()
    }
}
