//! Lazily started tasks.
//!
//! A [`Task`] owns a suspended computation: an `async` body that does not run
//! until the task is either started or awaited. It carries three pieces of
//! state:
//!
//! - a **result slot**: empty, a value, or a captured [`Fault`], and never more
//!   than one of them;
//! - a **continuation**: whoever is awaiting the task, woken exactly once when
//!   the body terminates;
//! - a **stop source**: assigned explicitly by [`Task::start`], or inherited
//!   from the awaiting task the first time the task is awaited.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted ──start()──▶ Running ──▶ Completed(value | fault) ──result()──▶ Consumed
//!      └──────await──────▶ Running (polled inline by the awaiter)
//! ```
//!
//! Awaiting a task that was never started runs its body inline on the
//! awaiting task: no extra spawn and no scheduling hop, and the awaiter
//! continues directly once the body finishes.
//!
//! # Cancellation
//!
//! When a task is first awaited, its stop source becomes a
//! [child](StopSource::child) of the awaiter's. A stop requested on an
//! outer task therefore reaches every task and operation parked beneath it,
//! while a stop requested on an inner task never travels upward.
//!
//! # Panics inside a body
//!
//! A panic raised by the body is captured when the body terminates and raised
//! again wherever the result is consumed: at the `.await`, in
//! [`Task::result`], or in [`Task::start_join`].

mod scoped;

pub(crate) use scoped::{Scoped, poll_scoped};

pub use crate::runtime::{JoinHandle, spawn};

use crate::cancel::StopSource;
use crate::error::{Fault, rethrow};
use crate::runtime::Runtime;
use crate::runtime::context;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type Body<T> = Pin<Box<dyn Future<Output = T> + Send>>;

enum State<T> {
    /// Created, body not yet polled.
    NotStarted(Body<T>),

    /// Being polled inline by an awaiting task.
    Inline(Body<T>),

    /// Started on an executor.
    Spawned(JoinHandle<Result<T, Fault>>),

    Completed(Result<T, Fault>),

    /// The outcome was handed out.
    Consumed,
}

/// A lazily started unit of suspendable computation.
///
/// # Examples
///
/// ```rust,ignore
/// let mut task = Task::new(async { 40 + 2 });
/// task.start(StopSource::new());
/// assert_eq!(task.await, 42);
/// ```
pub struct Task<T> {
    state: State<T>,
    stop: Option<StopSource>,
}

impl<T: Send + 'static> Task<T> {
    /// Wraps `body` without running any of it.
    pub fn new<F>(body: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            state: State::NotStarted(Box::pin(body)),
            stop: None,
        }
    }

    /// Starts the task on the runtime of the current thread.
    ///
    /// `stop` becomes the task's own stop source; pass
    /// [`StopSource::never`] to make the task uncancellable.
    ///
    /// # Panics
    ///
    /// Panics if the task was already started or awaited, or if called
    /// outside of a runtime.
    pub fn start(&mut self, stop: StopSource) {
        let scoped = self.prepare_start(stop);
        self.state = State::Spawned(crate::runtime::spawn(scoped));
    }

    /// Starts the task on `runtime`, from any thread.
    ///
    /// # Panics
    ///
    /// Panics if the task was already started or awaited.
    pub fn start_on(&mut self, runtime: &Runtime, stop: StopSource) {
        let scoped = self.prepare_start(stop);
        self.state = State::Spawned(runtime.spawn(scoped));
    }

    fn prepare_start(&mut self, stop: StopSource) -> Scoped<Body<T>> {
        let body = match std::mem::replace(&mut self.state, State::Consumed) {
            State::NotStarted(body) => body,
            other => {
                self.state = other;
                panic!("task already started");
            }
        };

        self.stop = Some(stop.clone());
        Scoped::new(body, stop)
    }

    /// Starts the task with a private stop source and blocks the calling
    /// thread until it completes.
    ///
    /// This is the boundary between the runtime and ordinary synchronous
    /// code; never call it from inside a task.
    pub fn start_join(mut self, runtime: &Runtime) -> T {
        self.start_on(runtime, StopSource::new());

        let State::Spawned(handle) = std::mem::replace(&mut self.state, State::Consumed) else {
            unreachable!("start_on always spawns");
        };

        rethrow(rethrow(crate::runtime::wait(handle)))
    }
}

impl<T> Task<T> {
    /// Requests a stop on the task's source, reaching every operation and
    /// task parked beneath it.
    ///
    /// Idempotent. Returns `true` only for the call that performed the
    /// request; `false` if the task has no active source yet.
    pub fn request_stop(&self) -> bool {
        self.stop.as_ref().is_some_and(StopSource::request_stop)
    }

    /// The task's stop source, once assigned.
    pub fn stop_source(&self) -> Option<&StopSource> {
        self.stop.as_ref()
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.state, State::NotStarted(_))
    }

    /// Returns `true` once the body has terminated.
    pub fn is_done(&self) -> bool {
        match &self.state {
            State::Spawned(handle) => handle.is_finished(),
            State::Completed(_) | State::Consumed => true,
            State::NotStarted(_) | State::Inline(_) => false,
        }
    }

    /// Takes the task's outcome, raising the body's panic if it had one.
    ///
    /// # Panics
    ///
    /// The outcome can be observed exactly once; calling this before the task
    /// has completed or a second time is a logic error.
    #[track_caller]
    pub fn result(&mut self) -> T {
        match std::mem::replace(&mut self.state, State::Consumed) {
            State::Completed(outcome) => rethrow(outcome),
            State::Spawned(handle) => match handle.try_take() {
                Some(outcome) => rethrow(rethrow(outcome)),
                None => {
                    self.state = State::Spawned(handle);
                    panic!("result() called before the task completed");
                }
            },
            State::Consumed => panic!("task result already taken"),
            other => {
                self.state = other;
                panic!("result() called before the task completed");
            }
        }
    }
}

// The output is never pinned; the body is boxed.
impl<T> Unpin for Task<T> {}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                State::NotStarted(_) => {
                    if this.stop.is_none() {
                        let inherited = context::current_stop()
                            .map(|parent| parent.child())
                            .unwrap_or_else(StopSource::never);
                        this.stop = Some(inherited);
                    }

                    let State::NotStarted(body) =
                        std::mem::replace(&mut this.state, State::Consumed)
                    else {
                        unreachable!();
                    };
                    this.state = State::Inline(body);
                }
                State::Inline(body) => {
                    let stop = this.stop.get_or_insert_with(StopSource::never);

                    match poll_scoped(body.as_mut(), stop, cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(outcome) => this.state = State::Completed(outcome),
                    }
                }
                State::Spawned(handle) => match Pin::new(handle).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(outcome) => this.state = State::Completed(rethrow(outcome)),
                },
                State::Completed(_) => {
                    let State::Completed(outcome) =
                        std::mem::replace(&mut this.state, State::Consumed)
                    else {
                        unreachable!();
                    };
                    return Poll::Ready(rethrow(outcome));
                }
                State::Consumed => panic!("task polled after its result was taken"),
            }
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::NotStarted(_) => "not-started",
            State::Inline(_) => "running-inline",
            State::Spawned(handle) if handle.is_finished() => "completed",
            State::Spawned(_) => "running",
            State::Completed(_) => "completed",
            State::Consumed => "consumed",
        };

        f.debug_struct("Task")
            .field("state", &state)
            .field("stop", &self.stop)
            .finish()
    }
}

/// Stop source of the task currently being polled on this thread.
///
/// Returns `None` outside of any task body.
pub fn current_stop() -> Option<StopSource> {
    context::current_stop()
}
