use crate::reactor::TimerHandle;
use crate::runtime::executor::worker::Worker;
use crate::runtime::task::{JoinHandle, spawn_on};
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Multi-threaded task executor.
///
/// The `Executor` is responsible for:
/// - spawning worker threads,
/// - coordinating task execution via work-stealing,
/// - installing the runtime context on every worker,
/// - managing orderly shutdown and thread joining.
///
/// It owns the global task injector and all worker threads.
pub(crate) struct Executor {
    /// Global injector queue shared by all workers.
    injector: Arc<Injector>,

    /// Per-worker queues, kept so they can be emptied at shutdown.
    locals: Arc<Vec<Arc<LocalQueue>>>,

    /// Join handles for worker threads.
    handles: Vec<thread::JoinHandle<()>>,

    /// Shutdown flag shared with all workers.
    shutdown: Arc<AtomicBool>,
}

impl Executor {
    /// Creates a new executor with `threads` worker threads named
    /// `{name}-worker-{id}`.
    ///
    /// Panics if a worker thread cannot be spawned.
    pub(crate) fn new(reactor: TimerHandle, threads: usize, name: &str) -> Self {
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Arc<Vec<_>> =
            Arc::new((0..threads).map(|_| Arc::new(LocalQueue::new())).collect());

        let mut executor = Self {
            injector,
            locals,
            handles: Vec::with_capacity(threads),
            shutdown,
        };

        for id in 0..threads {
            let worker = Worker::new(id, executor.locals.clone(), executor.injector.clone());
            let reactor = reactor.clone();
            let shutdown = executor.shutdown.clone();

            let spawned = thread::Builder::new()
                .name(format!("{name}-worker-{id}"))
                .spawn(move || worker.run(shutdown, reactor));

            match spawned {
                Ok(handle) => executor.handles.push(handle),
                Err(err) => {
                    // Stop the workers already running before giving up.
                    executor.shutdown();
                    executor.join();
                    panic!("failed to spawn worker thread {id}: {err}");
                }
            }
        }

        tracing::debug!(workers = threads, "executor started");

        executor
    }

    /// Signals all workers to shut down and wakes the parked ones.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.injector.shutdown();
    }

    /// Spawns a future onto the executor from any thread.
    pub(crate) fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("task spawned after executor shutdown; it will never run");
        }

        spawn_on(&self.injector, future)
    }

    /// Waits for all worker threads to terminate, then drops every task
    /// that was still queued.
    pub(crate) fn join(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }

        // Queued tasks own an `Arc` to the injector; clearing breaks the cycle.
        self.injector.clear();
        for local in self.locals.iter() {
            local.clear();
        }
    }
}
