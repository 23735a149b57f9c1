use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

/// Selects the time source of a runtime.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ClockKind {
    /// Monotonic wall-clock time. Waiting for a deadline puts the thread to
    /// sleep.
    #[default]
    System,

    /// Simulated time starting at zero. Waiting for a deadline jumps the
    /// clock straight to it, which makes timer tests instant and
    /// deterministic.
    Virtual,
}

/// The time source of a reactor. Times are offsets from its creation.
pub(crate) enum Clock {
    System { anchor: Instant },
    Virtual { now: Cell<Duration> },
}

impl Clock {
    pub(crate) fn new(kind: ClockKind) -> Self {
        match kind {
            ClockKind::System => Clock::System {
                anchor: Instant::now(),
            },
            ClockKind::Virtual => Clock::Virtual {
                now: Cell::new(Duration::ZERO),
            },
        }
    }

    pub(crate) fn kind(&self) -> ClockKind {
        match self {
            Clock::System { .. } => ClockKind::System,
            Clock::Virtual { .. } => ClockKind::Virtual,
        }
    }

    pub(crate) fn now(&self) -> Duration {
        match self {
            Clock::System { anchor } => anchor.elapsed(),
            Clock::Virtual { now } => now.get(),
        }
    }

    /// Blocks (or jumps) until `deadline` has been reached.
    pub(crate) fn park_until(&self, deadline: Duration) {
        match self {
            Clock::System { anchor } => {
                let remaining = deadline.saturating_sub(anchor.elapsed());
                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
            Clock::Virtual { now } => {
                if deadline > now.get() {
                    now.set(deadline);
                }
            }
        }
    }
}
