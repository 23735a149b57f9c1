use crate::error::fatal;
use crate::reactor::Reactor;

use std::cell::Cell;
use std::fmt;

/// Maximum number of combinators that may be nested inside one another.
///
/// Operation trees are built from concrete types, so their depth is fixed
/// at compile time. The limit turns an accidental runaway nesting into a
/// fatal error during the first poll instead of a stack overflow.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Wake state of the single root operation.
///
/// [`Context::wake`] records a request here; the driver consumes it with
/// [`take`](Self::take) and polls the root exactly once per consumed
/// request. Several wakes recorded before the driver looks again coalesce
/// into one poll.
#[derive(Debug, Default)]
pub struct WakeSignal {
    /// A re-poll of the root has been requested.
    requested: Cell<bool>,

    /// The root has completed; further wakes are ignored.
    completed: Cell<bool>,
}

impl WakeSignal {
    /// Creates a signal with no pending request for a root that has not
    /// completed.
    pub const fn new() -> Self {
        Self {
            requested: Cell::new(false),
            completed: Cell::new(false),
        }
    }

    /// Consumes a pending wake request, returning whether there was one.
    pub fn take(&self) -> bool {
        self.requested.replace(false)
    }

    /// Whether a wake request is pending.
    pub fn is_requested(&self) -> bool {
        self.requested.get()
    }

    /// Marks the root as completed. Later wakes become no-ops.
    pub(crate) fn complete(&self) {
        self.completed.set(true);
        self.requested.set(false);
    }

    /// Whether the root has completed.
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    /// Clears all state so the signal can serve a new root.
    pub(crate) fn reset(&self) {
        self.requested.set(false);
        self.completed.set(false);
    }
}

/// The context passed to every [`poll`](crate::Operation::poll) and
/// [`cancel`](crate::Operation::cancel).
///
/// A context identifies the single root operation being driven (through
/// its [`WakeSignal`]) and the reactor leaf operations register with.
pub struct Context<'a> {
    reactor: &'a Reactor,
    signal: &'a WakeSignal,
    depth: Cell<usize>,
}

impl<'a> Context<'a> {
    /// Creates a context for one root operation.
    pub fn new(reactor: &'a Reactor, signal: &'a WakeSignal) -> Self {
        Self {
            reactor,
            signal,
            depth: Cell::new(0),
        }
    }

    /// The reactor driving leaf operations.
    pub fn reactor(&self) -> &'a Reactor {
        self.reactor
    }

    /// Requests that the root operation be polled again.
    ///
    /// Safe to call from anywhere on the scheduling thread, including from
    /// inside a reactor callback, and any number of times. Once the root
    /// has completed this is a no-op.
    pub fn wake(&self) {
        if self.signal.is_completed() {
            tracing::trace!("wake after completion ignored");
            return;
        }

        tracing::trace!("wake requested");
        self.signal.requested.set(true);
    }

    /// Enters one level of combinator nesting for the lifetime of the
    /// returned guard.
    ///
    /// Raises a fatal error past [`MAX_NESTING_DEPTH`].
    #[track_caller]
    pub fn enter(&self) -> DepthGuard<'_> {
        let depth = self.depth.get() + 1;

        if depth > MAX_NESTING_DEPTH {
            fatal(format_args!(
                "operations nested deeper than {MAX_NESTING_DEPTH} levels"
            ));
        }

        self.depth.set(depth);
        DepthGuard { depth: &self.depth }
    }

    /// Current combinator nesting depth.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("reactor", &self.reactor)
            .field("signal", &self.signal)
            .field("depth", &self.depth.get())
            .finish()
    }
}

/// Leaves one level of nesting when dropped.
#[must_use]
pub struct DepthGuard<'c> {
    depth: &'c Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::ClockKind;

    #[test]
    fn wake_after_completion_is_ignored() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        cx.wake();
        cx.wake();
        assert!(signal.take());
        assert!(!signal.take(), "wakes coalesce");

        signal.complete();
        cx.wake();
        assert!(!signal.is_requested());
    }

    #[test]
    fn depth_guard_unwinds() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        {
            let _outer = cx.enter();
            let _inner = cx.enter();
            assert_eq!(cx.depth(), 2);
        }

        assert_eq!(cx.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "nested deeper than")]
    fn nesting_past_the_limit_is_fatal() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let guards: Vec<_> = (0..=MAX_NESTING_DEPTH).map(|_| cx.enter()).collect();
        drop(guards);
    }
}
