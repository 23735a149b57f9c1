use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Poll, ready};

/// The suspension points of one sequence, as a single state enum.
///
/// [`sequence!`](crate::sequence) generates one implementation per
/// sequence: a variant for every suspension point holding the awaited
/// operation and the locals still needed after it, plus an empty variant
/// for a step that has completed or been cancelled. The variant in use is
/// the resume marker.
pub trait StepSet {
    /// Output of the step that completed, together with its saved locals.
    type Resumed;

    /// Polls the step in flight.
    ///
    /// On completion the state is left empty and the output is handed back
    /// with the locals, ready for the code that follows the suspension
    /// point.
    fn poll_step(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Resumed>;

    /// Cancels the step in flight and drops its locals. A no-op on an empty
    /// state.
    fn cancel_step(self: Pin<&mut Self>, cx: &Context<'_>);

    /// Index of the step in flight, `None` once the state is empty.
    fn step(&self) -> Option<usize>;
}

/// Drives a [`StepSet`] with one resume function.
///
/// Each time the step in flight completes, `resume` runs the code up to the
/// next suspension point and returns either the next state or the final
/// output. Steps that complete immediately are resumed within the same
/// poll, in a loop, so a sequence never grows the call stack with the
/// number of steps it has.
#[pin_project]
#[derive(Debug)]
#[must_use = "operations do nothing unless polled"]
pub struct Steps<S, R> {
    #[pin]
    state: S,
    resume: R,
}

impl<S, R, T> Steps<S, R>
where
    S: StepSet,
    R: FnMut(S::Resumed) -> ControlFlow<T, S>,
{
    pub fn new(state: S, resume: R) -> Self {
        Steps { state, resume }
    }
}

impl<S: StepSet, R> Steps<S, R> {
    /// Index of the step in flight.
    pub fn step(&self) -> Option<usize> {
        self.state.step()
    }
}

impl<S, R, T> Operation for Steps<S, R>
where
    S: StepSet,
    R: FnMut(S::Resumed) -> ControlFlow<T, S>,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<T> {
        let mut this = self.project();

        loop {
            let resumed = ready!(this.state.as_mut().poll_step(cx));

            match (this.resume)(resumed) {
                ControlFlow::Continue(next) => {
                    tracing::trace!(step = ?next.step(), "Steps: resuming");
                    this.state.set(next);
                }
                ControlFlow::Break(output) => return Poll::Ready(output),
            }
        }
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        let this = self.project();

        tracing::trace!(step = ?this.state.step(), "Steps: cancelling");
        this.state.cancel_step(cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::{Ready, ready};
    use crate::error::fatal;
    use crate::reactor::{ClockKind, Reactor};
    use crate::runtime::{WakeSignal, YieldNow, yield_now};

    use std::pin::pin;

    /// Two hand-written steps: yield, then a ready value carrying a local.
    enum TwoSteps {
        Yield { op: YieldNow, base: u32 },
        Add { op: Ready<u32>, base: u32 },
        Empty,
    }

    enum Resumed {
        Yield { base: u32 },
        Add { value: u32, base: u32 },
    }

    impl StepSet for TwoSteps {
        type Resumed = Resumed;

        fn poll_step(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Resumed> {
            // Every field is `Unpin`.
            let this = self.get_mut();

            let resumed = match this {
                TwoSteps::Yield { op, base } => {
                    ready!(Pin::new(op).poll(cx));
                    Resumed::Yield { base: *base }
                }
                TwoSteps::Add { op, base } => {
                    let value = ready!(Pin::new(op).poll(cx));
                    Resumed::Add { value, base: *base }
                }
                TwoSteps::Empty => fatal("empty"),
            };

            *this = TwoSteps::Empty;
            Poll::Ready(resumed)
        }

        fn cancel_step(self: Pin<&mut Self>, _cx: &Context<'_>) {
            *self.get_mut() = TwoSteps::Empty;
        }

        fn step(&self) -> Option<usize> {
            match self {
                TwoSteps::Yield { .. } => Some(0),
                TwoSteps::Add { .. } => Some(1),
                TwoSteps::Empty => None,
            }
        }
    }

    fn resume(resumed: Resumed) -> ControlFlow<u32, TwoSteps> {
        match resumed {
            Resumed::Yield { base } => ControlFlow::Continue(TwoSteps::Add {
                op: ready(2),
                base: base + 1,
            }),
            Resumed::Add { value, base } => ControlFlow::Break(value * base),
        }
    }

    #[test]
    fn resumes_through_every_step() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let start = TwoSteps::Yield {
            op: yield_now(),
            base: 20,
        };
        let mut steps = pin!(Steps::new(start, resume));

        assert_eq!(steps.step(), Some(0));
        assert!(steps.as_mut().poll(&cx).is_pending());
        assert!(signal.take());

        // The ready step is resumed in the same poll.
        assert_eq!(steps.as_mut().poll(&cx), Poll::Ready(42));
        assert_eq!(steps.step(), None);
    }

    #[test]
    fn cancel_empties_the_state() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let start = TwoSteps::Yield {
            op: yield_now(),
            base: 1,
        };
        let mut steps = pin!(Steps::new(start, resume));

        assert!(steps.as_mut().poll(&cx).is_pending());
        steps.as_mut().cancel(&cx);

        assert_eq!(steps.step(), None);
    }
}
