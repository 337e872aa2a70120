//! Queues behind the executor.
//!
//! Spawned and woken tasks enter the shared [`injector`]; each worker drains
//! it into its own [`queue`] and, when both run dry, steals from a sibling
//! before parking on the injector's condition variable.

pub(crate) mod injector;
pub(crate) mod queue;
