use core::fmt;

/// Error returned when the reactor cannot accept a new timer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterError {
    /// Every slot of the fixed-size timer table is in use.
    Full { capacity: usize },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::Full { capacity } => {
                write!(f, "timer table is full ({capacity} slots in use)")
            }
        }
    }
}

impl core::error::Error for RegisterError {}

/// Error returned by [`Runtime::run`](crate::Runtime::run).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunError {
    /// The root operation is pending but nothing is registered that could
    /// ever wake it again.
    Stalled,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Stalled => f.write_str("root operation stalled with nothing left to wake it"),
        }
    }
}

impl core::error::Error for RunError {}

/// Reports an unrecoverable error and stops the task.
///
/// Used for contract violations (polling after completion, a missing
/// `cancel`, nesting past [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH))
/// and for setup failures that leave nothing to recover, such as a timer
/// that cannot be registered. The workspace release profile aborts on
/// panic, so this ends the process.
#[cold]
#[track_caller]
pub fn fatal(message: impl fmt::Display) -> ! {
    tracing::error!(%message, "fatal error");
    panic!("{message}")
}
