use crate::runtime::task::RawTask;

use std::sync::Arc;
use std::task::{Wake, Waker};

/// Waking a raw task reschedules it on the executor.
///
/// The waker shares ownership of the task, so the task stays alive for
/// as long as any of its wakers do.
impl<T: Send + 'static> Wake for RawTask<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.clone().schedule();
    }
}

/// Creates a [`Waker`] that reschedules `task` when woken.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<RawTask<T>>) -> Waker {
    Waker::from(task)
}
