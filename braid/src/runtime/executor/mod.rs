//! The multi-threaded executor.
//!
//! [`core`] owns the worker threads and their lifecycle; [`worker`] is the
//! loop each of them runs.

pub(crate) mod core;
pub(crate) mod worker;
