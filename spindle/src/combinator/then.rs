use crate::error::fatal;
use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Poll, ready};

/// Awaits `A`, hands its output to `F`, then awaits the operation `B`
/// that `F` returns.
///
/// The variants share storage, so a `Then` is as large as its larger step,
/// never the sum of both. When `A` completes, the continuation runs and
/// `B` is polled within the same call, so a step that is ready
/// immediately never yields.
///
/// `Then` suits a single dependent step. Long procedures are better
/// written with [`sequence!`](crate::sequence), which keeps every step in
/// one flat state enum instead of nesting one `Then` per step.
#[pin_project(project = ThenProj, project_replace = ThenProjReplace)]
#[derive(Debug)]
pub enum Then<A, F, B> {
    /// Awaiting the first step; the rest of the sequence is not built yet.
    First {
        #[pin]
        op: A,
        next: F,
    },
    /// Awaiting the operation returned by the continuation.
    Second {
        #[pin]
        op: B,
    },
    Done,
    Cancelled,
}

impl<A, F, B> Then<A, F, B> {
    pub fn new(op: A, next: F) -> Self {
        Then::First { op, next }
    }
}

impl<A, F, B> Operation for Then<A, F, B>
where
    A: Operation,
    F: FnOnce(A::Output) -> B,
    B: Operation,
{
    type Output = B::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        let _depth = cx.enter();

        loop {
            match self.as_mut().project() {
                ThenProj::First { op, .. } => {
                    let value = ready!(op.poll(cx));

                    let next = match self.as_mut().project_replace(Then::Done) {
                        ThenProjReplace::First { next, .. } => next,
                        _ => unreachable!(),
                    };

                    tracing::trace!("Then: first step done, resuming");
                    self.set(Then::Second { op: next(value) });
                }
                ThenProj::Second { op } => {
                    let output = ready!(op.poll(cx));
                    self.set(Then::Done);
                    return Poll::Ready(output);
                }
                ThenProj::Done => fatal("Then polled after completion"),
                ThenProj::Cancelled => fatal("Then polled after cancellation"),
            }
        }
    }

    /// Cancels only the step currently in flight. Steps that already
    /// completed are not touched again and later steps never run.
    fn cancel(mut self: Pin<&mut Self>, cx: &Context<'_>) {
        match self.as_mut().project() {
            ThenProj::First { op, .. } => op.cancel(cx),
            ThenProj::Second { op } => op.cancel(cx),
            ThenProj::Done | ThenProj::Cancelled => return,
        }

        self.set(Then::Cancelled);
    }
}
