//! The host event loop.
//!
//! This module contains the machinery that actually runs tasks: the
//! work-stealing executor, its queues, per-thread runtime context, and the
//! synchronous entry point. The structured-concurrency primitives
//! ([`Task`](crate::task::Task), [`Operation`](crate::operation::Operation),
//! [`Generator`](crate::generator::Generator), and the combinators) only
//! make progress while a [`Runtime`] is alive to poll them.
//!
//! It is responsible for:
//! - executing spawned futures on worker threads,
//! - managing task queues and work stealing,
//! - exposing the reactor and current stop source to running tasks,
//! - enabling cooperative multitasking via yielding.

mod core;
mod executor;
mod work_stealing;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod task;
pub(crate) mod yield_now;

pub use builder::{RuntimeBuilder, WORKER_THREADS_ENV};
pub use self::core::Runtime;
pub use task::{JoinHandle, spawn};

pub(crate) use self::core::wait;
