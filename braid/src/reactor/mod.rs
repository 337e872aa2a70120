//! Reactor thread and timer queue.
//!
//! The reactor is the part of the host event loop that dispatches events
//! the executor cannot produce on its own. In this runtime those events are
//! timer expiries: sleeps wake their task, and operation awaiters race a
//! timeout callback against their collaborator.
//!
//! It runs independently from the executor and communicates with it
//! through commands, wakers, and callbacks.

mod command;
mod core;
mod timer;

pub(crate) use self::core::Reactor;
pub(crate) use timer::Expiry;

pub use self::core::TimerHandle;
pub use timer::TimerGuard;
