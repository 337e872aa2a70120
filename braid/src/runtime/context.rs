use crate::cancel::StopSource;
use crate::reactor::TimerHandle;
use crate::runtime::work_stealing::injector::InjectorHandle;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    /// Thread-local handle to the current reactor.
    ///
    /// This is set when entering the runtime context and allows
    /// timers and operation awaiters to reach the reactor without
    /// explicit parameter passing.
    pub(crate) static CURRENT_REACTOR: RefCell<Option<TimerHandle>> =
        const { RefCell::new(None) };

    /// Thread-local handle to the global injector queue.
    pub(crate) static CURRENT_INJECTOR: RefCell<Option<InjectorHandle>> =
        const { RefCell::new(None) };

    /// Thread-local identifier of the current worker thread.
    pub(crate) static CURRENT_WORKER_ID: RefCell<Option<usize>> =
        const { RefCell::new(None) };

    /// Thread-local references to all local worker queues.
    pub(crate) static CURRENT_LOCALS: RefCell<Option<Arc<Vec<Arc<LocalQueue>>>>> =
        const { RefCell::new(None) };

    /// Stop source of the task whose body is being polled on this thread.
    ///
    /// Installed for the duration of each poll of a task body, so that
    /// awaited tasks and operation awaiters can inherit it.
    static CURRENT_STOP: RefCell<Option<StopSource>> = const { RefCell::new(None) };
}

/// Enters the runtime execution context for the current thread.
///
/// This function temporarily installs thread-local runtime state
/// (reactor and injector handles) for the duration of the closure `f`.
/// After the closure completes, the previous context is restored.
pub(crate) fn enter_context<R>(
    reactor: TimerHandle,
    injector: InjectorHandle,
    f: impl FnOnce() -> R,
) -> R {
    CURRENT_REACTOR.with(|r| {
        CURRENT_INJECTOR.with(|i| {
            let prev_r = r.replace(Some(reactor));
            let prev_i = i.replace(Some(injector));

            let out = f();

            i.replace(prev_i);
            r.replace(prev_r);

            out
        })
    })
}

/// Runs `f` with `stop` installed as the current stop source.
///
/// The previous source is restored even if `f` unwinds.
pub(crate) fn enter_stop<R>(stop: &StopSource, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<StopSource>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let prev = self.0.take();
            CURRENT_STOP.with(|cell| *cell.borrow_mut() = prev);
        }
    }

    let prev = CURRENT_STOP.with(|cell| cell.borrow_mut().replace(stop.clone()));
    let _restore = Restore(prev);

    f()
}

/// Stop source of the task currently being polled, if any.
pub(crate) fn current_stop() -> Option<StopSource> {
    CURRENT_STOP.with(|cell| cell.borrow().clone())
}
