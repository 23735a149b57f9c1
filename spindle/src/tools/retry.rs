use crate::error::fatal;
use crate::operation::Operation;
use crate::reactor::Reactor;
use crate::runtime::Context;
use crate::time::{Timer, sleep};

use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Poll, ready};
use std::time::Duration;

/// Creates an operation that retries the one built by `factory` until it
/// succeeds or `times` retries have failed.
///
/// The first attempt is built on the first poll. A failed attempt is
/// dropped and the next one is constructed in its place, so retrying never
/// allocates. Without an interval the next attempt starts on the following
/// turn of the driver.
pub fn retry<G, O, T, E>(times: usize, factory: G) -> Retry<'static, G, O>
where
    G: FnMut() -> O,
    O: Operation<Output = Result<T, E>>,
{
    Retry {
        factory,
        attempt: Attempt::Idle,
        remaining: times,
        interval: None,
    }
}

#[pin_project(project = AttemptProj)]
enum Attempt<'r, O> {
    /// The next attempt has not been built yet.
    Idle,
    Running(#[pin] O),
    /// Waiting out the interval before the next attempt.
    Backoff(#[pin] Timer<'r>),
    Done,
    Cancelled,
}

/// Operation returned by [`retry`].
#[pin_project]
#[must_use = "operations do nothing unless polled"]
pub struct Retry<'r, G, O> {
    factory: G,
    #[pin]
    attempt: Attempt<'r, O>,
    remaining: usize,
    interval: Option<(&'r Reactor, Duration)>,
}

impl<G, O> Retry<'_, G, O> {
    /// Waits `interval` on `reactor` between a failure and the next attempt.
    pub fn with_interval<'a>(self, reactor: &'a Reactor, interval: Duration) -> Retry<'a, G, O> {
        Retry {
            factory: self.factory,
            attempt: Attempt::Idle,
            remaining: self.remaining,
            interval: Some((reactor, interval)),
        }
    }

    /// Retries still available.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<G, O, T, E> Operation for Retry<'_, G, O>
where
    G: FnMut() -> O,
    O: Operation<Output = Result<T, E>>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        let _depth = cx.enter();
        let mut this = self.project();

        loop {
            match this.attempt.as_mut().project() {
                AttemptProj::Idle => {
                    tracing::trace!(remaining = *this.remaining, "retry: starting attempt");
                    this.attempt.set(Attempt::Running((this.factory)()));
                }
                AttemptProj::Running(op) => match ready!(op.poll(cx)) {
                    Ok(value) => {
                        this.attempt.set(Attempt::Done);
                        return Poll::Ready(Ok(value));
                    }
                    Err(err) if *this.remaining == 0 => {
                        tracing::debug!("retry: out of attempts");
                        this.attempt.set(Attempt::Done);
                        return Poll::Ready(Err(err));
                    }
                    Err(_) => {
                        *this.remaining -= 1;

                        match *this.interval {
                            Some((reactor, interval)) => {
                                this.attempt.set(Attempt::Backoff(sleep(reactor, interval)));
                            }
                            None => {
                                this.attempt.set(Attempt::Idle);
                                cx.wake();
                                return Poll::Pending;
                            }
                        }
                    }
                },
                AttemptProj::Backoff(timer) => {
                    ready!(timer.poll(cx));
                    this.attempt.set(Attempt::Idle);
                }
                AttemptProj::Done => fatal("Retry polled after completion"),
                AttemptProj::Cancelled => fatal("Retry polled after cancellation"),
            }
        }
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        let mut this = self.project();

        match this.attempt.as_mut().project() {
            AttemptProj::Running(op) => op.cancel(cx),
            AttemptProj::Backoff(timer) => timer.cancel(cx),
            AttemptProj::Idle => {}
            AttemptProj::Done | AttemptProj::Cancelled => return,
        }

        tracing::trace!("retry: cancelled");
        this.attempt.set(Attempt::Cancelled);
    }
}
