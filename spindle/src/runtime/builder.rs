use super::Runtime;
use crate::reactor::ClockKind;

/// Default number of timers a runtime can hold at once.
pub const DEFAULT_TIMER_CAPACITY: usize = 64;

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime. It configures the reactor clock and the size
/// of the timer table, which is allocated once by [`build`](Self::build).
///
/// # Examples
///
/// ```rust
/// use spindle::{ClockKind, RuntimeBuilder};
///
/// let runtime = RuntimeBuilder::new()
///     .clock(ClockKind::Virtual)
///     .timer_capacity(16)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct RuntimeBuilder {
    /// Time source of the reactor.
    clock: ClockKind,

    /// Number of slots in the reactor timer table.
    timer_capacity: usize,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    ///
    /// By default the runtime uses the system clock and can hold
    /// [`DEFAULT_TIMER_CAPACITY`] timers.
    pub fn new() -> Self {
        Self {
            clock: ClockKind::System,
            timer_capacity: DEFAULT_TIMER_CAPACITY,
        }
    }

    /// Sets the time source of the reactor.
    pub fn clock(mut self, clock: ClockKind) -> Self {
        self.clock = clock;
        self
    }

    /// Shorthand for `clock(ClockKind::Virtual)`.
    pub fn virtual_clock(self) -> Self {
        self.clock(ClockKind::Virtual)
    }

    /// Sets the number of timers that may be registered at once.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn timer_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "timer_capacity must be > 0");

        self.timer_capacity = n;
        self
    }

    /// Builds the runtime with the configured options.
    ///
    /// This is the only place the runtime allocates: the timer table is
    /// reserved here and never grows.
    pub fn build(self) -> Runtime {
        tracing::debug!(
            clock = ?self.clock,
            timer_capacity = self.timer_capacity,
            "building runtime"
        );

        Runtime::new(self.clock, self.timer_capacity)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_system_clock() {
        let runtime = RuntimeBuilder::new().build();
        assert_eq!(runtime.reactor().clock_kind(), ClockKind::System);
    }

    #[test]
    fn virtual_clock_starts_at_zero() {
        let runtime = RuntimeBuilder::new().virtual_clock().build();
        assert_eq!(runtime.reactor().clock_kind(), ClockKind::Virtual);
        assert!(runtime.reactor().now().is_zero());
    }

    #[test]
    #[should_panic(expected = "timer_capacity must be > 0")]
    fn zero_capacity_is_rejected() {
        let _ = RuntimeBuilder::new().timer_capacity(0);
    }
}
