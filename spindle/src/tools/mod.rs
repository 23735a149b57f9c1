//! Retry utilities for fallible operations.
//!
//! The main entry point is [`retry`], which creates an operation that
//! rebuilds a failed operation from a factory closure until it succeeds or
//! the retry limit is reached, optionally waiting between attempts.

mod retry;

#[doc(inline)]
pub use retry::{Retry, retry};
