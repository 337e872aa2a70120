use super::command::Command;
use super::timer::{Expiry, TimerEntry, TimerGuard, TimerState};
use crate::runtime::context::CURRENT_REACTOR;

use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::Instant;

/// The reactor thread state.
///
/// The reactor owns the timer heap. It sleeps until either the earliest
/// deadline passes or a new command arrives, then fires every expired,
/// non-cancelled timer.
///
/// Cancelled entries release their action at once but stay in the heap until
/// popped; the heap is swept of them whenever it doubles past `sweep_at`.
pub(crate) struct Reactor {
    receiver: Receiver<Command>,
    timers: BinaryHeap<TimerEntry>,
    sweep_at: usize,
}

const MIN_SWEEP: usize = 64;

impl Reactor {
    fn new() -> (Self, Sender<Command>) {
        let (transmitter, receiver) = channel();

        (
            Self {
                receiver,
                timers: BinaryHeap::new(),
                sweep_at: MIN_SWEEP,
            },
            transmitter,
        )
    }

    /// Spawns the reactor thread and returns a handle to it.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread.
    pub(crate) fn start(name: &str) -> TimerHandle {
        let (mut reactor, sender) = Reactor::new();

        thread::Builder::new()
            .name(format!("{name}-reactor"))
            .spawn(move || reactor.run())
            .unwrap_or_else(|err| panic!("failed to spawn reactor thread: {err}"));

        TimerHandle { sender }
    }

    fn run(&mut self) {
        tracing::debug!("reactor started");

        loop {
            self.fire_expired();

            let command = match self.timers.peek() {
                Some(next) => {
                    let wait = next.deadline.saturating_duration_since(Instant::now());

                    match self.receiver.recv_timeout(wait) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.receiver.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };

            match command {
                Command::SetTimer { deadline, state } => {
                    self.timers.push(TimerEntry { deadline, state });
                    self.sweep();
                }
                Command::Shutdown => break,
            }
        }

        tracing::debug!(pending = self.timers.len(), "reactor stopped");
    }

    fn fire_expired(&mut self) {
        let now = Instant::now();

        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.timers.pop() else {
                break;
            };

            if let Some(expiry) = timer.state.take() {
                tracing::trace!("timer fired");
                expiry.fire();
            }
        }
    }

    fn sweep(&mut self) {
        if self.timers.len() < self.sweep_at {
            return;
        }

        let before = self.timers.len();
        self.timers.retain(|timer| !timer.state.is_cancelled());
        self.sweep_at = (self.timers.len() * 2).max(MIN_SWEEP);

        tracing::trace!(
            swept = before - self.timers.len(),
            pending = self.timers.len(),
            "swept cancelled timers"
        );
    }
}

/// Handle to the reactor thread that owns a runtime's timers.
///
/// Obtain one with [`Runtime::timer`](crate::Runtime::timer) or
/// [`TimerHandle::current`] from inside a running task.
#[derive(Clone)]
pub struct TimerHandle {
    sender: Sender<Command>,
}

impl TimerHandle {
    /// Returns the timer of the runtime running the current thread, if any.
    pub fn current() -> Option<TimerHandle> {
        CURRENT_REACTOR.with(|cell| cell.borrow().clone())
    }

    /// Runs `callback` on the reactor thread once `deadline` is reached,
    /// unless the returned guard is cancelled first.
    pub fn schedule<F>(&self, deadline: Instant, callback: F) -> TimerGuard
    where
        F: FnOnce() + Send + 'static,
    {
        self.set_timer(deadline, Expiry::Call(Box::new(callback)))
    }

    pub(crate) fn set_timer(&self, deadline: Instant, expiry: Expiry) -> TimerGuard {
        let state = Arc::new(TimerState::new(expiry));

        let sent = self.sender.send(Command::SetTimer {
            deadline,
            state: state.clone(),
        });

        if sent.is_err() {
            tracing::warn!("timer scheduled after reactor shutdown; it will never fire");
        }

        TimerGuard { state }
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}
