use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the executor exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    /// On the first poll the task reschedules itself and returns
    /// `Poll::Pending`; on the second poll it completes.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.0 {
            return Poll::Ready(());
        }

        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields execution back to the executor once.
///
/// This is a suspension point that needs no collaborator: other tasks get a
/// chance to run, and a generator body awaiting it stays parked without
/// producing a value.
pub async fn yield_now() {
    YieldOnce(false).await
}
