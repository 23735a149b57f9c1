use crate::error::fatal;
use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Poll, ready};
use std::time::Duration;

/// Operation returned by [`instrumented`].
///
/// Records the reactor time of the first poll and completes with the
/// wrapped output together with the time elapsed since then. Under the
/// virtual clock the measurement is exact.
#[pin_project]
#[derive(Debug)]
#[must_use = "operations do nothing unless polled"]
pub struct Instrumented<O> {
    #[pin]
    op: O,
    start: Option<Duration>,
    done: bool,
}

impl<O: Operation> Operation for Instrumented<O> {
    type Output = (O::Output, Duration);

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if *this.done {
            fatal("Instrumented polled after completion");
        }

        let now = cx.reactor().now();
        let start = *this.start.get_or_insert(now);

        let output = ready!(this.op.poll(cx));
        let elapsed = cx.reactor().now().saturating_sub(start);

        *this.done = true;
        tracing::debug!(?elapsed, "instrumented operation completed");

        Poll::Ready((output, elapsed))
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        let this = self.project();

        if !*this.done {
            this.op.cancel(cx);
            *this.done = true;
        }
    }
}

/// Measures how long `op` takes, from its first poll to its completion.
///
/// # Examples
///
/// ```rust
/// use spindle::RuntimeBuilder;
/// use spindle::time::{instrumented, sleep};
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// let op = instrumented(sleep(runtime.reactor(), Duration::from_millis(40)));
///
/// let ((), elapsed) = runtime.block_on(op);
/// assert_eq!(elapsed, Duration::from_millis(40));
/// ```
pub fn instrumented<O: Operation>(op: O) -> Instrumented<O> {
    Instrumented {
        op,
        start: None,
        done: false,
    }
}
