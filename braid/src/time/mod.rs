//! Time utilities.
//!
//! This module provides time-related primitives that integrate with the
//! runtime reactor:
//! - [`sleep`] for suspending a task until a deadline,
//! - [`TimerHandle`] for scheduling callbacks on the reactor thread, the
//!   mechanism behind operation timeouts.

mod sleep;

#[doc(inline)]
pub use sleep::{Sleep, sleep};

pub use crate::reactor::{TimerGuard, TimerHandle};
