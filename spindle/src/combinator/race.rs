use crate::error::fatal;
use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Poll, ready};

/// A fixed, heterogeneous set of operations that can be raced.
///
/// Implemented for tuples of one to eight operations sharing the same
/// `Output`. The children live inline in the tuple, so a race embeds in
/// its owner's storage without any indirection.
pub trait RaceSet {
    /// Output shared by every child.
    type Output;

    /// Number of children.
    const LEN: usize;

    /// Polls every child in construction order and returns the index and
    /// output of the first one that is ready.
    fn poll_in_order(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<(usize, Self::Output)>;

    /// Cancels every child except `spare`, each exactly once.
    fn cancel_except(self: Pin<&mut Self>, spare: Option<usize>, cx: &Context<'_>);
}

macro_rules! impl_race_set {
    ($len:literal; $($idx:tt => $T:ident),+) => {
        impl<Out, $($T),+> RaceSet for ($($T,)+)
        where
            $($T: Operation<Output = Out>,)+
        {
            type Output = Out;

            const LEN: usize = $len;

            fn poll_in_order(
                self: Pin<&mut Self>,
                cx: &Context<'_>,
            ) -> Poll<(usize, Out)> {
                // Safety: tuple fields are structurally pinned; none is
                // ever moved out of the tuple
                let this = unsafe { self.get_unchecked_mut() };

                $(
                    // Safety: see above
                    let child = unsafe { Pin::new_unchecked(&mut this.$idx) };
                    if let Poll::Ready(value) = child.poll(cx) {
                        return Poll::Ready(($idx, value));
                    }
                )+

                Poll::Pending
            }

            fn cancel_except(
                self: Pin<&mut Self>,
                spare: Option<usize>,
                cx: &Context<'_>,
            ) {
                // Safety: tuple fields are structurally pinned; none is
                // ever moved out of the tuple
                let this = unsafe { self.get_unchecked_mut() };

                $(
                    if spare != Some($idx) {
                        // Safety: see above
                        unsafe { Pin::new_unchecked(&mut this.$idx) }.cancel(cx);
                    }
                )+
            }
        }
    };
}

impl_race_set!(1; 0 => A);
impl_race_set!(2; 0 => A, 1 => B);
impl_race_set!(3; 0 => A, 1 => B, 2 => C);
impl_race_set!(4; 0 => A, 1 => B, 2 => C, 3 => D);
impl_race_set!(5; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_race_set!(6; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_race_set!(7; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_race_set!(8; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    Running,
    Finished { victor: usize },
    Cancelled,
}

/// Operation returned by [`race`].
///
/// Each poll visits the children in construction order. The first child
/// that reports ready wins: every other child is cancelled exactly once,
/// in a single pass that skips the winner, and the race completes with the
/// winner's output. If no child is ready the race stays pending and
/// nothing changes.
///
/// Construction order is the only tie-break. When two children would both
/// be ready in the same turn, the earlier one wins and the later one is
/// cancelled without its output ever being read.
///
/// A race owns its children. Building a new race on every iteration of a
/// loop therefore sets up and tears down every child on every iteration;
/// lend a child with `Pin<&mut O>` to keep it alive across races.
#[pin_project]
#[derive(Debug)]
pub struct Race<S> {
    #[pin]
    set: S,
    state: State,
}

impl<S: RaceSet> Race<S> {
    pub fn new(set: S) -> Self {
        Self {
            set,
            state: State::Running,
        }
    }

    /// Index of the winning child, once the race has finished.
    pub fn victor(&self) -> Option<usize> {
        match self.state {
            State::Finished { victor } => Some(victor),
            _ => None,
        }
    }
}

impl<S: RaceSet> Operation for Race<S> {
    type Output = S::Output;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        let _depth = cx.enter();
        let mut this = self.project();

        match *this.state {
            State::Running => {}
            State::Finished { .. } => fatal("Race polled after completion"),
            State::Cancelled => fatal("Race polled after cancellation"),
        }

        let (victor, value) = ready!(this.set.as_mut().poll_in_order(cx));

        tracing::trace!(victor, children = S::LEN, "Race: finished");

        this.set.cancel_except(Some(victor), cx);
        *this.state = State::Finished { victor };

        Poll::Ready(value)
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        let this = self.project();

        if *this.state == State::Running {
            this.set.cancel_except(None, cx);
            *this.state = State::Cancelled;
        }
    }
}

/// Races a tuple of operations; the first to complete wins.
///
/// # Examples
///
/// ```rust
/// use spindle::{OperationExt, RuntimeBuilder};
/// use spindle::combinator::race;
/// use spindle::time::sleep;
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// let reactor = runtime.reactor();
///
/// let winner = runtime.block_on(race((
///     sleep(reactor, Duration::from_millis(100)).map(|()| "slow"),
///     sleep(reactor, Duration::from_millis(50)).map(|()| "fast"),
/// )));
///
/// assert_eq!(winner, "fast");
/// ```
pub fn race<S: RaceSet>(set: S) -> Race<S> {
    Race::new(set)
}
