use super::Runtime;

use std::env;
use std::thread;

/// Environment variable overriding the default number of worker threads.
pub const WORKER_THREADS_ENV: &str = "BRAID_WORKER_THREADS";

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .thread_name("ingest")
///     .build();
/// ```
pub struct RuntimeBuilder {
    /// Number of worker threads in the executor.
    worker_threads: usize,

    /// Prefix of every thread spawned by the runtime.
    thread_name: String,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    ///
    /// The number of worker threads is read from `BRAID_WORKER_THREADS` when
    /// it holds a positive integer, and otherwise defaults to the number of
    /// available logical CPUs, falling back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = worker_threads_from_env().unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });

        Self {
            worker_threads,
            thread_name: String::from("braid"),
        }
    }

    /// Sets the number of worker threads used by the runtime.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix used to name the runtime's threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Builds the runtime with the configured options.
    ///
    /// This starts the reactor and the worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `worker_threads` is zero or if any runtime thread cannot be
    /// spawned.
    pub fn build(self) -> Runtime {
        tracing::debug!(
            worker_threads = self.worker_threads,
            name = %self.thread_name,
            "building runtime"
        );

        Runtime::new(self.worker_threads, &self.thread_name)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_threads_from_env() -> Option<usize> {
    let raw = env::var(WORKER_THREADS_ENV).ok()?;

    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(value = %raw, "ignoring invalid {WORKER_THREADS_ENV}");
            None
        }
    }
}
