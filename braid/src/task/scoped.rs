use crate::cancel::StopSource;
use crate::error::Fault;
use crate::runtime::context::enter_stop;

use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Polls a body with its stop source installed as the current one, and
/// captures a panic raised by the body as a [`Fault`].
///
/// Every place that runs a task body goes through this wrapper: inline
/// awaits, started tasks, and fan-out children.
pub(crate) struct Scoped<F> {
    body: Pin<Box<F>>,
    stop: StopSource,
}

impl<F: Future> Scoped<F> {
    pub(crate) fn new(body: F, stop: StopSource) -> Self {
        Self {
            body: Box::pin(body),
            stop,
        }
    }
}

impl<F: Future> Future for Scoped<F> {
    type Output = Result<F::Output, Fault>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        poll_scoped(this.body.as_mut(), &this.stop, cx)
    }
}

/// One guarded poll of `body` under `stop`.
pub(crate) fn poll_scoped<F: Future + ?Sized>(
    body: Pin<&mut F>,
    stop: &StopSource,
    cx: &mut Context<'_>,
) -> Poll<Result<F::Output, Fault>> {
    let polled = panic::catch_unwind(AssertUnwindSafe(|| enter_stop(stop, || body.poll(cx))));

    match polled {
        Ok(Poll::Pending) => Poll::Pending,
        Ok(Poll::Ready(value)) => Poll::Ready(Ok(value)),
        Err(payload) => Poll::Ready(Err(Fault::new(payload))),
    }
}
