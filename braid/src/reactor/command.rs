use super::timer::TimerState;

use std::sync::Arc;
use std::time::Instant;

/// Requests sent to the reactor thread.
pub(crate) enum Command {
    SetTimer {
        deadline: Instant,
        state: Arc<TimerState>,
    },
    Shutdown,
}
