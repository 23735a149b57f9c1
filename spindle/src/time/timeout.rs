use super::sleep::{Timer, sleep};
use crate::combinator::{Map, Race};
use crate::operation::{Operation, OperationExt};
use crate::reactor::Reactor;
use crate::runtime::Context;

use pin_project::pin_project;
use std::fmt;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

/// Error returned by [`timeout`] when the deadline passes first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Elapsed(());

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("deadline has elapsed")
    }
}

impl core::error::Error for Elapsed {}

type Outcome<T> = Result<T, Elapsed>;

fn elapsed<T>((): ()) -> Outcome<T> {
    Err(Elapsed(()))
}

/// Operation returned by [`timeout`].
///
/// A race between the wrapped operation and a timer. The wrapped operation
/// is polled first, so when both are ready in the same turn the operation
/// wins.
#[pin_project]
#[must_use = "operations do nothing unless polled"]
pub struct Timeout<'r, O: Operation> {
    #[pin]
    race: Race<(
        Map<O, fn(O::Output) -> Outcome<O::Output>>,
        Map<Timer<'r>, fn(()) -> Outcome<O::Output>>,
    )>,
}

impl<O: Operation> Timeout<'_, O> {
    /// Whether the deadline won the race.
    pub fn is_elapsed(&self) -> bool {
        self.race.victor() == Some(1)
    }
}

impl<O: Operation> Operation for Timeout<'_, O> {
    type Output = Outcome<O::Output>;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        self.project().race.poll(cx)
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        self.project().race.cancel(cx)
    }
}

/// Requires `op` to complete within `duration`.
///
/// Completes with `Ok` and the operation's output, or with `Err(Elapsed)`
/// after cancelling the operation once the deadline has passed.
///
/// # Examples
///
/// ```rust
/// use spindle::RuntimeBuilder;
/// use spindle::time::{sleep, timeout};
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// let reactor = runtime.reactor();
///
/// let slow = sleep(reactor, Duration::from_secs(5));
/// let result = runtime.block_on(timeout(reactor, Duration::from_secs(1), slow));
///
/// assert!(result.is_err());
/// ```
pub fn timeout<O: Operation>(reactor: &Reactor, duration: Duration, op: O) -> Timeout<'_, O> {
    let op = op.map(Ok as fn(O::Output) -> Outcome<O::Output>);
    let deadline = sleep(reactor, duration).map(elapsed as fn(()) -> Outcome<O::Output>);

    Timeout {
        race: Race::new((op, deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::ready;
    use crate::runtime::RuntimeBuilder;

    #[test]
    fn completes_before_deadline() {
        let runtime = RuntimeBuilder::new().virtual_clock().build();
        let reactor = runtime.reactor();

        let op = sleep(reactor, Duration::from_millis(10)).map(|()| 7);
        let result = runtime.block_on(timeout(reactor, Duration::from_millis(20), op));

        assert_eq!(result, Ok(7));
        assert_eq!(reactor.now(), Duration::from_millis(10));
        assert_eq!(reactor.pending(), 0);
    }

    #[test]
    fn deadline_cancels_operation() {
        let runtime = RuntimeBuilder::new().virtual_clock().build();
        let reactor = runtime.reactor();

        let op = sleep(reactor, Duration::from_millis(50));
        let result = runtime.block_on(timeout(reactor, Duration::from_millis(20), op));

        assert_eq!(result, Err(Elapsed(())));
        assert_eq!(reactor.now(), Duration::from_millis(20));
        assert_eq!(reactor.pending(), 0);
    }

    #[test]
    fn ready_operation_beats_zero_deadline() {
        let runtime = RuntimeBuilder::new().virtual_clock().build();
        let reactor = runtime.reactor();

        let result = runtime.block_on(timeout(reactor, Duration::ZERO, ready("now")));

        assert_eq!(result, Ok("now"));
        assert_eq!(reactor.pending(), 0);
    }

    #[test]
    fn elapsed_display() {
        assert_eq!(Elapsed(()).to_string(), "deadline has elapsed");
    }
}
