use super::{Latch, parent_stop, raise_first};

use crate::error::Fault;
use crate::runtime::spawn;
use crate::task::Scoped;

use parking_lot::Mutex;

use std::future::{Future, poll_fn};
use std::sync::Arc;

struct Settled<T> {
    latch: Latch,
    values: Mutex<Vec<Option<T>>>,
    faults: Mutex<Vec<Option<Fault>>>,
}

/// Runs every child to completion and collects their outcomes by index.
///
/// Never raises: a child that panicked leaves `None` in the value vector and
/// its [`Fault`] in the fault vector, at the same index.
///
/// # Examples
///
/// ```rust,ignore
/// let (values, faults) = until_all_settled([fetch(1), fetch(2)]).await;
/// ```
pub async fn until_all_settled<I, F, T>(children: I) -> (Vec<Option<T>>, Vec<Option<Fault>>)
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let children: Vec<F> = children.into_iter().collect();
    let count = children.len();

    if count == 0 {
        return (Vec::new(), Vec::new());
    }

    let state = Arc::new(Settled {
        latch: Latch::new(count),
        values: Mutex::new((0..count).map(|_| None).collect()),
        faults: Mutex::new((0..count).map(|_| None).collect()),
    });

    let stop = parent_stop();

    for (index, child) in children.into_iter().enumerate() {
        let state = state.clone();
        let child = Scoped::new(child, stop.child());

        spawn(async move {
            match child.await {
                Ok(value) => state.values.lock()[index] = Some(value),
                Err(fault) => state.faults.lock()[index] = Some(fault),
            }

            if state.latch.arrive() {
                tracing::trace!(count, "fan-out settled");
                state.latch.wake();
            }
        });
    }

    poll_fn(|cx| state.latch.poll_until(cx, || state.latch.is_open())).await;

    let values = std::mem::take(&mut *state.values.lock());
    let faults = std::mem::take(&mut *state.faults.lock());

    (values, faults)
}

/// Runs every child to completion and returns their values in order.
///
/// If any child panicked, the panic of the lowest-index one is raised once
/// all siblings have finished.
pub async fn until_all<I, F, T>(children: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (values, faults) = until_all_settled(children).await;

    raise_first(faults);

    values.into_iter().flatten().collect()
}
