use crate::runtime::task::Runnable;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A per-worker local task queue.
///
/// Tasks spawned from a worker thread land here. The owner pushes and
/// pops at the back (LIFO) for cache locality; other workers steal from
/// the front (FIFO).
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<Arc<dyn Runnable>>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.inner.lock().push_back(task);
    }

    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.inner.lock().pop_back()
    }

    /// Removes a task from the front of the queue, for use by other workers.
    pub(crate) fn steal(&self) -> Option<Arc<dyn Runnable>> {
        self.inner.lock().pop_front()
    }

    /// Drops every queued task.
    pub(crate) fn clear(&self) {
        let drained: Vec<_> = self.inner.lock().drain(..).collect();
        drop(drained);
    }
}
