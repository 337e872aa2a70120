//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the runtime.
//! In particular, it exposes a [`Slab`] allocator used for fast indexed
//! storage with reuse of freed slots: stop callbacks and the in-flight set
//! of [`while_next`](crate::combinator::while_next) both live in one.

mod slab;

pub(crate) use slab::Slab;
