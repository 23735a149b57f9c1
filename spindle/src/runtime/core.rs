use super::context::{Context, WakeSignal};
use crate::error::{RunError, fatal};
use crate::operation::Operation;
use crate::reactor::{ClockKind, Reactor};

use std::cell::Cell;
use std::pin::{Pin, pin};
use std::task::Poll;

/// The top-level driver.
///
/// `Runtime` is responsible for:
/// - owning the reactor that leaf operations register with,
/// - pinning the root operation and performing its first poll,
/// - servicing the reactor and re-polling the root once per wake,
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// Exactly one root operation runs at a time, on the calling thread.
pub struct Runtime {
    /// Timer source for leaf operations.
    reactor: Reactor,

    /// Wake state of the root currently being driven.
    signal: WakeSignal,

    /// Guards against driving two roots at once.
    running: Cell<bool>,
}

impl Runtime {
    /// Creates a new runtime instance.
    ///
    /// # Arguments
    ///
    /// * `clock` - Time source of the reactor.
    /// * `timer_capacity` - Maximum number of timers registered at once.
    pub(crate) fn new(clock: ClockKind, timer_capacity: usize) -> Self {
        Self {
            reactor: Reactor::new(clock, timer_capacity),
            signal: WakeSignal::new(),
            running: Cell::new(false),
        }
    }

    /// The reactor operations for this runtime must register with.
    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    /// Drives `op` to completion on the current thread.
    ///
    /// The operation is pinned for the whole run. After the first poll the
    /// runtime waits for the nearest timer, fires expired timers one at a
    /// time and polls the root once after every callback that woke it.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Stalled`] if the root is pending while no timer
    /// is registered and no wake is pending. The root is cancelled before
    /// returning.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an operation driven by this runtime.
    pub fn run<O: Operation>(&self, op: O) -> Result<O::Output, RunError> {
        if self.running.replace(true) {
            fatal("Runtime::run called while another root is running");
        }

        let _running = RunningGuard(&self.running);
        let mut op = pin!(op);

        self.signal.reset();
        let cx = Context::new(&self.reactor, &self.signal);

        tracing::debug!(reactor = ?self.reactor, "run: first poll");

        if let Poll::Ready(output) = self.poll_root(op.as_mut(), &cx) {
            return Ok(output);
        }

        loop {
            if self.signal.take() {
                if let Poll::Ready(output) = self.poll_root(op.as_mut(), &cx) {
                    return Ok(output);
                }
                continue;
            }

            let Some(deadline) = self.reactor.next_deadline() else {
                tracing::warn!("root operation is pending with nothing left to wake it");
                op.as_mut().cancel(&cx);
                return Err(RunError::Stalled);
            };

            self.reactor.park_until(deadline);

            while self.reactor.fire_next(&cx) {
                if !self.signal.take() {
                    continue;
                }

                if let Poll::Ready(output) = self.poll_root(op.as_mut(), &cx) {
                    return Ok(output);
                }
            }
        }
    }

    /// Runs `op` to completion, treating a stall as fatal.
    ///
    /// This is the synchronous entry point used by `main` functions and
    /// tests.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spindle::RuntimeBuilder;
    /// use spindle::combinator::ready;
    ///
    /// let runtime = RuntimeBuilder::new().virtual_clock().build();
    /// assert_eq!(runtime.block_on(ready(42)), 42);
    /// ```
    pub fn block_on<O: Operation>(&self, op: O) -> O::Output {
        match self.run(op) {
            Ok(output) => output,
            Err(err) => fatal(err),
        }
    }

    fn poll_root<O: Operation>(&self, op: Pin<&mut O>, cx: &Context<'_>) -> Poll<O::Output> {
        tracing::trace!(now = ?self.reactor.now(), "polling root");

        let poll = op.poll(cx);

        if poll.is_ready() {
            self.signal.complete();
            tracing::debug!(now = ?self.reactor.now(), "root operation completed");
        }

        poll
    }
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
