//! Executor-level tasks.
//!
//! This module defines how the executor represents, schedules, and
//! runs spawned futures:
//! - task state management,
//! - custom waker integration,
//! - join handles for awaiting task completion,
//! - the raw task and runnable abstractions.
//!
//! User code reaches it through [`spawn`] and [`JoinHandle`]; the lazily
//! started [`Task`](crate::task::Task) is built on top of it.

pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod state;
pub(crate) mod waker;

pub(crate) use self::core::{RawTask, Runnable, spawn_on};

pub use self::core::spawn;
pub use handle::JoinHandle;
