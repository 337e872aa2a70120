use super::parent_stop;

use crate::error::Fault;
use crate::generator::Generator;
use crate::runtime::spawn;
use crate::task::Scoped;
use crate::utils::Slab;

use parking_lot::Mutex;

use std::future::{Future, poll_fn};
use std::sync::Arc;
use std::task::{Poll, Waker};

/// Per-item tasks still running, keyed by slab index.
struct InFlight {
    tasks: Slab<()>,
    waker: Option<Waker>,
}

/// Pulls items out of `generator` one at a time and runs `factory(item)` for
/// each of them concurrently.
///
/// Every per-item outcome is reported to `collector` as
/// `(fault, value)`: exactly one of the two is set. The collector's future is
/// awaited before the item counts as finished, which lets it apply
/// back-pressure. A panicking collector is logged and otherwise ignored.
///
/// Resolves with the generator's terminal value once the generator is
/// exhausted and every per-item task has been collected. A panic raised by
/// the generator body is raised here at that point.
pub async fn while_next<T, R, U, Fac, Work, C, Collect>(
    mut generator: Generator<T, R>,
    mut factory: Fac,
    collector: C,
) -> R
where
    Fac: FnMut(T) -> Work,
    Work: Future<Output = U> + Send + 'static,
    U: Send + 'static,
    C: Fn(Option<Fault>, Option<U>) -> Collect + Send + Sync + 'static,
    Collect: Future<Output = ()> + Send + 'static,
{
    let collector = Arc::new(collector);
    let stop = parent_stop();

    let in_flight = Arc::new(Mutex::new(InFlight {
        tasks: Slab::new(8),
        waker: None,
    }));

    let mut produced = 0usize;

    while let Some(item) = generator.next_deferred().await {
        produced += 1;

        let item_stop = stop.child();
        let work = Scoped::new(factory(item), item_stop.clone());
        let key = in_flight.lock().tasks.insert(());

        let collector = collector.clone();
        let in_flight = in_flight.clone();

        spawn(async move {
            let (fault, value) = match work.await {
                Ok(value) => (None, Some(value)),
                Err(fault) => (Some(fault), None),
            };

            let collect = Scoped::new(async move { collector(fault, value).await }, item_stop);

            if let Err(fault) = collect.await {
                tracing::error!(%fault, "collector panicked");
            }

            let waker = {
                let mut in_flight = in_flight.lock();
                in_flight.tasks.remove(key);

                match in_flight.tasks.is_empty() {
                    true => in_flight.waker.take(),
                    false => None,
                }
            };

            if let Some(waker) = waker {
                waker.wake();
            }
        });
    }

    // Suspend only if work is still in flight at the instant of the check;
    // the last item takes the waker under the same lock.
    poll_fn(|cx| {
        let mut in_flight = in_flight.lock();

        if in_flight.tasks.is_empty() {
            return Poll::Ready(());
        }

        in_flight.waker = Some(cx.waker().clone());
        Poll::Pending
    })
    .await;

    tracing::debug!(produced, "generator fan-out drained");

    generator.finish()
}
