use super::{Latch, parent_stop, raise_first};

use crate::error::Fault;
use crate::runtime::spawn;
use crate::task::Scoped;

use parking_lot::Mutex;

use std::future::{Future, poll_fn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Race<T> {
    won: AtomicBool,
    latch: Latch,
    winner: Mutex<Option<T>>,
    faults: Mutex<Vec<Option<Fault>>>,
}

impl<T> Race<T> {
    fn is_decided(&self) -> bool {
        self.winner.lock().is_some() || self.latch.is_open()
    }
}

/// Resolves with the value of the first child to succeed.
///
/// Losing children are not cancelled: they run on and their outcomes are
/// dropped when they finish. If every child panics, the panic of the
/// lowest-index one is raised.
///
/// # Panics
///
/// Panics when `children` is empty.
pub async fn until_one<I, F, T>(children: I) -> T
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let children: Vec<F> = children.into_iter().collect();
    let count = children.len();

    assert!(count > 0, "until_one requires at least one child");

    let state = Arc::new(Race {
        won: AtomicBool::new(false),
        latch: Latch::new(count),
        winner: Mutex::new(None),
        faults: Mutex::new((0..count).map(|_| None).collect()),
    });

    let stop = parent_stop();

    for (index, child) in children.into_iter().enumerate() {
        let state = state.clone();
        let child = Scoped::new(child, stop.child());

        spawn(async move {
            let mut wake = false;

            match child.await {
                Ok(value) => {
                    if state
                        .won
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        tracing::trace!(index, "race won");
                        *state.winner.lock() = Some(value);
                        wake = true;
                    }
                }
                Err(fault) => state.faults.lock()[index] = Some(fault),
            }

            // Everyone failed: the last child hands the faults back.
            if state.latch.arrive() && !state.won.load(Ordering::Acquire) {
                tracing::trace!(count, "every racer failed");
                wake = true;
            }

            if wake {
                state.latch.wake();
            }
        });
    }

    poll_fn(|cx| state.latch.poll_until(cx, || state.is_decided())).await;

    if let Some(value) = state.winner.lock().take() {
        return value;
    }

    raise_first(std::mem::take(&mut *state.faults.lock()));
    unreachable!("every racer failed without a fault");
}
