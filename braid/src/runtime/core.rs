use super::executor::core::Executor;
use super::task::JoinHandle;
use crate::error::rethrow;
use crate::reactor::{Reactor, TimerHandle};

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

/// The host event loop.
///
/// `Runtime` is responsible for:
/// - spawning asynchronous tasks,
/// - driving task execution via the work-stealing executor,
/// - dispatching timers from the reactor thread,
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// Dropping the runtime shuts down all internal components in an orderly
/// fashion. Tasks that have not completed by then are dropped.
pub struct Runtime {
    /// Task executor responsible for scheduling and running futures.
    executor: Executor,

    /// Handle to the reactor thread.
    reactor: TimerHandle,
}

impl Runtime {
    /// Starts the reactor and `worker_threads` workers.
    pub(crate) fn new(worker_threads: usize, name: &str) -> Self {
        let reactor = Reactor::start(name);
        let executor = Executor::new(reactor.clone(), worker_threads, name);

        Self { executor, reactor }
    }

    /// Spawns a future onto the runtime.
    ///
    /// The returned handle resolves with the future's output, or with the
    /// [`Fault`](crate::Fault) it panicked with. Dropping the handle detaches
    /// the task.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// The future runs on the worker threads; the calling thread sleeps on a
    /// condition variable until the future's completion signals it. A panic
    /// raised by the future is raised again here.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async { 42 });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.spawn(future);
        rethrow(wait(handle))
    }

    /// Returns a handle to this runtime's timers.
    pub fn timer(&self) -> TimerHandle {
        self.reactor.clone()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Drop for Runtime {
    /// Shuts down the runtime.
    ///
    /// This performs the following steps:
    /// 1. Signals the executor to shut down
    /// 2. Sends a shutdown command to the reactor
    /// 3. Joins all worker threads and drops queued tasks
    fn drop(&mut self) {
        self.executor.shutdown();
        self.reactor.shutdown();
        self.executor.join();

        tracing::debug!("runtime shut down");
    }
}

/// Wakes a thread blocked in [`wait`].
struct Signal {
    notified: Mutex<bool>,
    condvar: Condvar,
}

impl Wake for Signal {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        *self.notified.lock() = true;
        self.condvar.notify_one();
    }
}

/// Blocks the calling thread until `future` completes.
///
/// Only suitable for futures that are driven by other threads, such as a
/// [`JoinHandle`].
pub(crate) fn wait<F: Future>(future: F) -> F::Output {
    let signal = Arc::new(Signal {
        notified: Mutex::new(false),
        condvar: Condvar::new(),
    });
    let waker = Waker::from(signal.clone());
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }

        let mut notified = signal.notified.lock();
        while !*notified {
            signal.condvar.wait(&mut notified);
        }
        *notified = false;
    }
}
