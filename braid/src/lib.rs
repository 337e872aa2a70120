//! # Braid
//!
//! **Braid** is a structured-concurrency runtime for Rust. It turns
//! callback-driven asynchronous objects (sockets, resolvers, transfer handles)
//! into lazily started tasks that can be composed, raced against timeouts,
//! and cancelled from the outside.
//!
//! The crate is organised around a handful of primitives:
//!
//! - [`task::Task`]: a lazily started unit of suspendable computation with a
//!   single result slot and its own stop source,
//! - [`operation::operation`]: an awaiter that races a collaborator's
//!   completion against an optional timeout and an optional stop request,
//!   with exactly one winner,
//! - [`generator::Generator`]: a lazy, finite, non-restartable sequence,
//! - [`combinator`]: `until_all`, `until_one` and `while_next` to fan work
//!   out and collect it again,
//! - [`cancel`]: one-way stop signals that flow from a task to everything
//!   parked beneath it.
//!
//! Everything runs on a [`Runtime`]: a work-stealing executor paired with a
//! timer thread.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use braid::operation::{Collaborator, operation};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[braid::main]
//! async fn main() -> braid::Result<()> {
//!     let resolver = Arc::new(Resolver::new());
//!
//!     let addr = operation(resolver, |r, done| r.lookup("example.org", |res| done.complete(res)))
//!         .timeout(Duration::from_secs(2))
//!         .cancellable()
//!         .await?;
//!
//!     println!("{addr}");
//!     Ok(())
//! }
//! ```
//!
//! ## Errors and panics
//!
//! Expected failures (a collaborator error, a timeout, an abort) travel
//! through [`Result`]. A panic inside a task body is captured as a [`Fault`]
//! and raised again wherever the task's result is consumed.

mod error;
mod reactor;
mod runtime;
mod utils;

pub mod cancel;
pub mod combinator;
pub mod generator;
pub mod operation;
pub mod task;
pub mod time;

pub use error::{Error, Fault, Result, ResultExt};
pub use runtime::yield_now::yield_now;
pub use runtime::{Runtime, RuntimeBuilder, WORKER_THREADS_ENV};

pub use braid_macros::{main, test, until_all, until_all_settled};
