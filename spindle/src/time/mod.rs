//! Time utilities.
//!
//! [`sleep`] is the leaf every timed operation is built on. [`timeout`]
//! and [`instrumented`] wrap other operations with a deadline or a
//! stopwatch.

mod instrumented;
mod sleep;
mod timeout;

pub use instrumented::{Instrumented, instrumented};
pub use sleep::{Timer, sleep};
pub use timeout::{Elapsed, Timeout, timeout};
