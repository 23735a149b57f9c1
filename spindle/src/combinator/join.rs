use crate::error::fatal;
use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::Poll;

/// A child of a [`Join`], together with its output once it completed.
#[pin_project(project = MaybeDoneProj, project_replace = MaybeDoneProjReplace)]
pub enum MaybeDone<O: Operation> {
    Running(#[pin] O),
    Done(O::Output),
    Taken,
    Cancelled,
}

impl<O: Operation> MaybeDone<O> {
    /// Polls the child if it is still running; returns whether it is done.
    fn poll_done(mut self: Pin<&mut Self>, cx: &Context<'_>) -> bool {
        match self.as_mut().project() {
            MaybeDoneProj::Running(op) => match op.poll(cx) {
                Poll::Ready(output) => {
                    self.set(MaybeDone::Done(output));
                    true
                }
                Poll::Pending => false,
            },
            MaybeDoneProj::Done(_) => true,
            MaybeDoneProj::Taken => fatal("Join polled after completion"),
            MaybeDoneProj::Cancelled => fatal("Join polled after cancellation"),
        }
    }

    fn take(self: Pin<&mut Self>) -> O::Output {
        match self.project_replace(MaybeDone::Taken) {
            MaybeDoneProjReplace::Done(output) => output,
            _ => unreachable!(),
        }
    }

    /// Cancels the child if it has not completed yet.
    fn cancel(mut self: Pin<&mut Self>, cx: &Context<'_>) {
        if let MaybeDoneProj::Running(op) = self.as_mut().project() {
            op.cancel(cx);
            self.set(MaybeDone::Cancelled);
        }
    }
}

/// A fixed, heterogeneous set of operations that can be joined.
///
/// Implemented for tuples of one to eight operations; the output is the
/// tuple of their outputs.
pub trait JoinSet {
    /// Slots holding each child until it completes.
    type Slots;

    /// Tuple of every child's output.
    type Output;

    fn into_slots(self) -> Self::Slots;

    /// Polls every unfinished child in construction order; returns whether
    /// all of them are done.
    fn poll_all(slots: Pin<&mut Self::Slots>, cx: &Context<'_>) -> bool;

    fn take_all(slots: Pin<&mut Self::Slots>) -> Self::Output;

    /// Cancels every child that has not completed yet.
    fn cancel_running(slots: Pin<&mut Self::Slots>, cx: &Context<'_>);
}

macro_rules! impl_join_set {
    ($($idx:tt => $T:ident),+) => {
        impl<$($T: Operation),+> JoinSet for ($($T,)+) {
            type Slots = ($(MaybeDone<$T>,)+);
            type Output = ($($T::Output,)+);

            fn into_slots(self) -> Self::Slots {
                ($(MaybeDone::Running(self.$idx),)+)
            }

            fn poll_all(slots: Pin<&mut Self::Slots>, cx: &Context<'_>) -> bool {
                // Safety: tuple fields are structurally pinned; none is
                // moved out while pinned
                let slots = unsafe { slots.get_unchecked_mut() };
                let mut all_done = true;

                $(
                    // Safety: see above
                    all_done &= unsafe { Pin::new_unchecked(&mut slots.$idx) }.poll_done(cx);
                )+

                all_done
            }

            fn take_all(slots: Pin<&mut Self::Slots>) -> Self::Output {
                // Safety: `take` replaces each slot in place
                let slots = unsafe { slots.get_unchecked_mut() };

                // Safety: see above
                ($(unsafe { Pin::new_unchecked(&mut slots.$idx) }.take(),)+)
            }

            fn cancel_running(slots: Pin<&mut Self::Slots>, cx: &Context<'_>) {
                // Safety: tuple fields are structurally pinned
                let slots = unsafe { slots.get_unchecked_mut() };

                $(
                    // Safety: see above
                    unsafe { Pin::new_unchecked(&mut slots.$idx) }.cancel(cx);
                )+
            }
        }
    };
}

impl_join_set!(0 => A);
impl_join_set!(0 => A, 1 => B);
impl_join_set!(0 => A, 1 => B, 2 => C);
impl_join_set!(0 => A, 1 => B, 2 => C, 3 => D);
impl_join_set!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_join_set!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_join_set!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_join_set!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);

/// Operation returned by [`join`].
///
/// Every poll visits each unfinished child in construction order. The join
/// completes with the tuple of outputs once all children are done.
/// Cancelling it cancels only the children still running.
#[pin_project]
pub struct Join<S: JoinSet> {
    #[pin]
    slots: S::Slots,
    done: bool,
}

impl<S: JoinSet> Operation for Join<S> {
    type Output = S::Output;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        let _depth = cx.enter();
        let mut this = self.project();

        if *this.done {
            fatal("Join polled after completion");
        }

        if !S::poll_all(this.slots.as_mut(), cx) {
            return Poll::Pending;
        }

        *this.done = true;
        tracing::trace!("Join: all children done");

        Poll::Ready(S::take_all(this.slots))
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        let this = self.project();

        if !*this.done {
            S::cancel_running(this.slots, cx);
            *this.done = true;
        }
    }
}

/// Runs a tuple of operations side by side and completes with all of their
/// outputs.
///
/// # Examples
///
/// ```rust
/// use spindle::RuntimeBuilder;
/// use spindle::combinator::{join, ready};
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// assert_eq!(runtime.block_on(join((ready(1), ready("two")))), (1, "two"));
/// ```
pub fn join<S: JoinSet>(set: S) -> Join<S> {
    Join {
        slots: set.into_slots(),
        done: false,
    }
}
