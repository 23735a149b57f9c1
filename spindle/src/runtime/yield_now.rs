use super::Context;
use crate::error::fatal;
use crate::operation::{Operation, cancel_noop};

use std::pin::Pin;
use std::task::Poll;

/// An operation that yields back to the driver exactly once.
#[derive(Debug)]
pub struct YieldNow {
    yielded: bool,
    done: bool,
}

impl Operation for YieldNow {
    type Output = ();

    /// On the first poll, the operation requests a re-poll of the root and
    /// returns `Poll::Pending`. On the second poll, it completes.
    fn poll(mut self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        if self.done {
            fatal("YieldNow polled after completion");
        }

        if !self.yielded {
            self.yielded = true;
            cx.wake();
            return Poll::Pending;
        }

        self.done = true;
        Poll::Ready(())
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        cancel_noop(self, cx)
    }
}

/// Yields execution back to the driver.
///
/// The root is polled again right away, so sibling operations get another
/// look before the current sequence continues.
///
/// # Examples
///
/// ```rust
/// use spindle::{RuntimeBuilder, yield_now};
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// runtime.block_on(yield_now());
/// ```
pub fn yield_now() -> YieldNow {
    YieldNow {
        yielded: false,
        done: false,
    }
}
