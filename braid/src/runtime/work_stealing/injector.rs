use crate::runtime::task::Runnable;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shared handle to the global task injector.
pub(crate) type InjectorHandle = Arc<Injector>;

/// Runtime-wide FIFO of runnable tasks.
///
/// Tasks spawned from outside a worker, and every woken task, land here.
/// Idle workers sleep on `condvar`; `parked` counts them so a push only
/// signals when someone is actually waiting.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,
    parked: Mutex<usize>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

impl Injector {
    /// Creates a new empty injector.
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            parked: Mutex::new(0),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        let _parked = self.parked.lock();
        self.condvar.notify_all();
    }

    /// Pushes a task into the global injector and wakes one parked worker.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.queue.lock().push_back(task);

        if *self.parked.lock() > 0 {
            self.condvar.notify_one();
        }
    }

    /// Parks the current worker thread until work becomes available
    /// or a shutdown signal is received.
    ///
    /// Workers only park if the injector queue is empty. The wait is
    /// bounded so that work pushed onto another worker's local queue is
    /// eventually stolen.
    pub(crate) fn park(&self) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }

        let mut parked = self.parked.lock();

        if !self.queue.lock().is_empty() {
            return;
        }

        *parked += 1;
        let _ = self
            .condvar
            .wait_for(&mut parked, Duration::from_millis(1));
        *parked -= 1;
    }

    /// Takes the oldest queued task.
    pub(crate) fn steal(&self) -> Option<Arc<dyn Runnable>> {
        self.queue.lock().pop_front()
    }

    /// Drops every queued task.
    pub(crate) fn clear(&self) {
        let drained: Vec<_> = self.queue.lock().drain(..).collect();
        drop(drained);
    }
}
