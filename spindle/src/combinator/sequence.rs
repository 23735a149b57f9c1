use crate::error::fatal;
use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Poll, ready};

/// A sequential composite: a multi-step procedure as one operation.
///
/// A `Sequence` starts with a builder closure holding the code before the
/// first suspension point. Nothing runs at construction; the first poll
/// runs the builder, which returns the remaining steps (a [`Steps`]
/// machine, or a plain [`Ready`](super::Ready) when nothing is awaited),
/// and the sequence then drives them to completion.
///
/// However many steps it has, a sequence takes one level of
/// [nesting depth](crate::MAX_NESTING_DEPTH).
///
/// Sequences are normally written with the [`sequence!`](crate::sequence)
/// macro rather than by hand:
///
/// ```rust
/// use spindle::RuntimeBuilder;
/// use spindle::time::sleep;
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// let reactor = runtime.reactor();
///
/// let total = runtime.block_on(spindle::sequence! {
///     let mut ticks = 0;
///     sleep(reactor, Duration::from_millis(10)).await;
///     ticks += 1;
///     sleep(reactor, Duration::from_millis(10)).await;
///     ticks + 1
/// });
///
/// assert_eq!(total, 2);
/// assert_eq!(reactor.now(), Duration::from_millis(20));
/// ```
///
/// [`Steps`]: super::Steps
#[pin_project(project = SequenceProj, project_replace = SequenceProjReplace)]
#[derive(Debug)]
pub enum Sequence<F, B> {
    /// Not polled yet.
    Start { build: F },
    /// Paused inside the chain.
    Running {
        #[pin]
        chain: B,
    },
    Done,
    Cancelled,
}

impl<F, B> Sequence<F, B>
where
    F: FnOnce() -> B,
    B: Operation,
{
    pub fn new(build: F) -> Self {
        Sequence::Start { build }
    }
}

impl<F, B> Operation for Sequence<F, B>
where
    F: FnOnce() -> B,
    B: Operation,
{
    type Output = B::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        let _depth = cx.enter();

        if let SequenceProj::Start { .. } = self.as_mut().project() {
            let build = match self.as_mut().project_replace(Sequence::Done) {
                SequenceProjReplace::Start { build } => build,
                _ => unreachable!(),
            };

            tracing::trace!("Sequence: starting");
            self.set(Sequence::Running { chain: build() });
        }

        match self.as_mut().project() {
            SequenceProj::Running { chain } => {
                let output = ready!(chain.poll(cx));
                self.set(Sequence::Done);
                Poll::Ready(output)
            }
            SequenceProj::Done => fatal("Sequence polled after completion"),
            SequenceProj::Cancelled => fatal("Sequence polled after cancellation"),
            SequenceProj::Start { .. } => unreachable!(),
        }
    }

    fn cancel(mut self: Pin<&mut Self>, cx: &Context<'_>) {
        match self.as_mut().project() {
            SequenceProj::Start { .. } => {}
            SequenceProj::Running { chain } => chain.cancel(cx),
            SequenceProj::Done | SequenceProj::Cancelled => return,
        }

        tracing::trace!("Sequence: cancelled");
        self.set(Sequence::Cancelled);
    }
}
