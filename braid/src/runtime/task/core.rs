use super::JoinHandle;
use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::error::Fault;
use crate::runtime::context::{CURRENT_INJECTOR, CURRENT_LOCALS, CURRENT_WORKER_ID};
use crate::runtime::task::waker::make_waker;
use crate::runtime::work_stealing::injector::Injector;

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// A runnable unit of work that can be executed by the scheduler.
///
/// The `Runnable` trait abstracts the specific return type of a task,
/// allowing the executor to manage a heterogeneous collection of tasks
/// through `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Executes the task. This is typically called by a worker thread.
    fn run(self: Arc<Self>);
}

/// A spawned future owned by the executor.
///
/// `RawTask` coordinates the lifecycle of that future: its scheduling
/// state, the wakers of the handles awaiting it, and its outcome. A panic
/// raised while polling is captured as a [`Fault`] and stored as the outcome,
/// so a failing task never takes a worker thread down with it.
pub(crate) struct RawTask<T> {
    /// The underlying future.
    ///
    /// Wrapped in `UnsafeCell` for interior mutability during `poll`; the
    /// RUNNING state guarantees exclusive access.
    future: UnsafeCell<Option<Pin<Box<dyn Future<Output = T> + Send>>>>,

    /// Outcome of the future, written once before the state becomes COMPLETED.
    pub(crate) result: UnsafeCell<Option<Result<T, Fault>>>,

    /// The current lifecycle state of the task (IDLE, RUNNING, etc.).
    pub(crate) state: AtomicUsize,

    /// Reference to the global injector queue for rescheduling.
    injector: Arc<Injector>,

    /// Wakers of `JoinHandle`s awaiting this task.
    pub(crate) waiters: Mutex<Vec<Waker>>,
}

// Safety: the cells are only touched by the thread that moved the state to
// RUNNING (future) or after COMPLETED was published with release ordering
// (result).
unsafe impl<T: Send> Send for RawTask<T> {}
unsafe impl<T: Send> Sync for RawTask<T> {}

impl<T: Send + 'static> RawTask<T> {
    /// Creates a new task in the `QUEUED` state.
    pub(crate) fn new<F>(future: F, injector: Arc<Injector>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Some(Box::pin(future))),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            injector,
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Performs one execution slice of the task.
    ///
    /// This method transitions the task to `RUNNING`, polls the inner future,
    /// and handles the resulting `Poll` state:
    /// - `Poll::Pending`: Transitions back to `IDLE` or re-queues if notified.
    /// - `Poll::Ready` or a panic: Stores the outcome and notifies all waiters.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: the RUNNING state guarantees that no other thread is polling this future.
        let slot = unsafe { &mut *self.future.get() };
        let Some(future) = slot.as_mut() else {
            return;
        };

        let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        let outcome = match poll {
            Ok(Poll::Pending) => {
                // Return to IDLE state unless a wake-up occurred during execution (NOTIFIED).
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.state.store(QUEUED, Ordering::Release);
                    self.injector.push(self.clone());
                }
                return;
            }
            Ok(Poll::Ready(value)) => Ok(value),
            Err(payload) => {
                let fault = Fault::new(payload);
                tracing::debug!(%fault, "spawned task panicked");
                Err(fault)
            }
        };

        // The future is finished; release whatever it still owns.
        *slot = None;

        // Safety: no handle reads the result before COMPLETED is published below.
        unsafe {
            *self.result.get() = Some(outcome);
        }
        self.state.store(COMPLETED, Ordering::Release);

        let waiters = std::mem::take(&mut *self.waiters.lock());
        for waiter in waiters {
            waiter.wake();
        }
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is pushed to the scheduler.
    /// If the task is `RUNNING`, it moves to `NOTIFIED` to ensure it is re-polled
    /// immediately after its current execution slice.
    pub(crate) fn schedule(self: Arc<Self>) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            match state {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.injector.push(self.clone());
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, notified, or finished: nothing to do.
                _ => return,
            }
        }
    }
}

impl<T: Send + 'static> Runnable for RawTask<T> {
    fn run(self: Arc<Self>) {
        RawTask::run(self)
    }
}

/// Spawns a future as a task onto the current runtime.
///
/// The task is pushed to the local worker's queue when called from a
/// worker thread, and to the global injector otherwise.
///
/// Dropping the returned [`JoinHandle`] does not cancel the task.
///
/// # Panics
///
/// Panics if called outside the context of a running runtime.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let injector = CURRENT_INJECTOR.with(|cell| {
        cell.borrow()
            .as_ref()
            .expect("spawn must be called within the context of a runtime")
            .clone()
    });

    let task = Arc::new(RawTask::new(future, injector.clone()));

    let pushed_locally = CURRENT_WORKER_ID.with(|id_cell| {
        let Some(id) = *id_cell.borrow() else {
            return false;
        };

        CURRENT_LOCALS.with(|locals_cell| match locals_cell.borrow().as_ref() {
            Some(locals) => {
                locals[id].push(task.clone());
                true
            }
            None => false,
        })
    });

    if !pushed_locally {
        injector.push(task.clone());
    }

    JoinHandle { task }
}

/// Spawns a future directly onto `injector`, bypassing the thread context.
pub(crate) fn spawn_on<F, T>(injector: &Arc<Injector>, future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let task = Arc::new(RawTask::new(future, injector.clone()));
    injector.push(task.clone());

    JoinHandle { task }
}
