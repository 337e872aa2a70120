#![allow(dead_code)]

use braid::Error;
use braid::operation::{Collaborator, Completion};
use braid::time::TimerHandle;

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

/// Routes runtime logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A collaborator that parks completions until the test resolves them.
#[derive(Default)]
pub struct Probe {
    initiations: AtomicUsize,
    cancels: AtomicUsize,
    parked: Mutex<Option<Completion<u32>>>,
    echo_abort: bool,
    timer: Option<TimerHandle>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reports `Error::Aborted` through the parked completion when cancelled.
    pub fn echoing() -> Arc<Self> {
        Arc::new(Self {
            echo_abort: true,
            ..Self::default()
        })
    }

    /// Schedules timeouts on `timer` instead of the polling runtime's.
    pub fn with_timer(timer: TimerHandle) -> Arc<Self> {
        Arc::new(Self {
            timer: Some(timer),
            ..Self::default()
        })
    }

    pub fn park(&self, done: Completion<u32>) {
        self.initiations.fetch_add(1, Ordering::SeqCst);
        *self.parked.lock().unwrap() = Some(done);
    }

    /// Completes on a helper thread after `delay`.
    pub fn complete_after(&self, done: Completion<u32>, delay: Duration, value: u32) {
        self.initiations.fetch_add(1, Ordering::SeqCst);

        thread::spawn(move || {
            thread::sleep(delay);
            done.succeed(value);
        });
    }

    pub fn take(&self) -> Option<Completion<u32>> {
        self.parked.lock().unwrap().take()
    }

    /// Spins until a completion is parked.
    pub fn wait_parked(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);

        while self.parked.lock().unwrap().is_none() {
            assert!(Instant::now() < deadline, "operation was never initiated");
            thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn initiations(&self) -> usize {
        self.initiations.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl Collaborator for Probe {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);

        if self.echo_abort {
            if let Some(done) = self.take() {
                done.fail(Error::Aborted);
            }
        }
    }

    fn timer(&self) -> Option<TimerHandle> {
        self.timer.clone()
    }
}

/// Extracts the message of a `panic!` payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic>"
    }
}
