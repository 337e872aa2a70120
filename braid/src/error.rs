//! Outcome types shared by every primitive of the runtime.
//!
//! Two channels carry failures:
//!
//! - [`Result<T>`] is the explicit channel. Operation awaiters resolve with it,
//!   whether the collaborator failed, the timer won, or cancellation won. It never
//!   raises on its own; callers check it or propagate it with `?`, which reads the
//!   same inside an ordinary function and inside an `async` task body.
//! - [`Fault`] is a captured panic. A panic raised inside a task body is caught when
//!   the body terminates and raised again wherever the task's result is consumed.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::panic;

/// Errors delivered through [`Result`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The awaiter's timer fired before the collaborator completed.
    #[error("operation timed out")]
    Timeout,

    /// Cancellation was requested before the collaborator completed.
    #[error("operation aborted")]
    Aborted,

    /// The collaborator reported an I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The collaborator reported an opaque error, passed through verbatim.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary collaborator error.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error::Other(error.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

/// A value or an [`Error`], never both.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Accessors mirroring the vocabulary used throughout the runtime docs.
pub trait ResultExt<T> {
    /// `true` when a value is held.
    fn has_value(&self) -> bool;

    /// `true` when an error is held.
    fn has_error(&self) -> bool;

    /// Returns the value.
    ///
    /// # Panics
    ///
    /// Asking for the value of an error result is a programming error.
    fn value(self) -> T;

    /// Returns the value, or raises the error as a panic.
    ///
    /// Inside a task body the panic is captured as a [`Fault`] whose payload
    /// downcasts back to the original [`Error`].
    fn value_or_throw(self) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn has_value(&self) -> bool {
        self.is_ok()
    }

    fn has_error(&self) -> bool {
        self.is_err()
    }

    #[track_caller]
    fn value(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => panic!("value() called on a result holding an error: {err}"),
        }
    }

    fn value_or_throw(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => panic::panic_any(err),
        }
    }
}

/// A panic captured from a task body, a generator, or a fan-out child.
pub struct Fault {
    payload: Box<dyn Any + Send>,
}

impl Fault {
    pub(crate) fn new(payload: Box<dyn Any + Send>) -> Self {
        Self { payload }
    }

    /// The panic message, when the payload is a string.
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.payload.downcast_ref::<&'static str>() {
            return Some(s);
        }

        self.payload.downcast_ref::<String>().map(String::as_str)
    }

    pub fn is<E: Any>(&self) -> bool {
        self.payload.is::<E>()
    }

    /// Borrows the payload as `E`, e.g. the [`Error`] raised by
    /// [`ResultExt::value_or_throw`].
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }

    /// Returns the raw panic payload.
    pub fn into_panic(self) -> Box<dyn Any + Send> {
        self.payload
    }

    /// Raises the captured panic again on the current thread.
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.payload)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.to_string())
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = self.message() {
            return write!(f, "task panicked: {message}");
        }

        if let Some(err) = self.downcast_ref::<Error>() {
            return write!(f, "task raised: {err}");
        }

        f.write_str("task panicked")
    }
}

impl StdError for Fault {}

/// Unwraps a captured outcome, raising the fault if there is one.
pub(crate) fn rethrow<T>(outcome: std::result::Result<T, Fault>) -> T {
    match outcome {
        Ok(value) => value,
        Err(fault) => fault.resume(),
    }
}
