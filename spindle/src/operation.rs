use crate::combinator::{Either, Map, Then};
use crate::error::fatal;
use crate::runtime::Context;

use core::pin::Pin;
use core::task::Poll;

/// A unit of asynchronous work driven by repeated polling.
///
/// An operation starts fresh, returns [`Poll::Pending`] from zero or more
/// polls and ends in exactly one terminal state: it either returned
/// [`Poll::Ready`] once, or it was cancelled.
///
/// # Contract
///
/// - `poll` may be called any number of times while the operation is
///   pending. Once it returned `Ready` it must not be called again; every
///   operation in this crate treats that as a fatal programming error.
/// - `cancel` is called at most once, right after the last `Pending` and
///   before any further `poll`. It must release every external
///   registration before it returns. Cancelling an operation that already
///   completed, or that was never polled, is a no-op.
/// - Both methods take `Pin<&mut Self>`: an operation that has been polled
///   never moves again until it is dropped.
///
/// The default `cancel` is [`cancel_unimplemented`], so an operation that
/// owns a resource but forgets to say how to release it fails loudly the
/// first time it is cancelled. Operations without external resources
/// override it with [`cancel_noop`].
#[must_use = "operations do nothing unless polled"]
pub trait Operation {
    /// The value produced on completion.
    type Output;

    /// Attempts to make progress.
    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output>;

    /// Synchronously abandons the operation and releases its resources.
    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        cancel_unimplemented(self, cx)
    }
}

/// Standard `cancel` for operations that hold no external resource.
#[inline]
pub fn cancel_noop<O: ?Sized>(_op: Pin<&mut O>, _cx: &Context<'_>) {}

/// Standard `cancel` for operations that have not implemented cancellation.
///
/// Raises a fatal error naming the operation type.
#[cold]
#[track_caller]
pub fn cancel_unimplemented<O: ?Sized>(_op: Pin<&mut O>, _cx: &Context<'_>) {
    fatal(format_args!(
        "cancel is not implemented for `{}`",
        core::any::type_name::<O>()
    ))
}

/// A borrowed operation.
///
/// The borrow lets a child outlive the combinators it is lent to, for
/// example a resource that must survive every iteration of a loop of
/// races. Cancelling the borrow is a no-op: only the owner may cancel the
/// operation itself.
impl<O> Operation for Pin<&mut O>
where
    O: Operation + ?Sized,
{
    type Output = O::Output;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        self.get_mut().as_mut().poll(cx)
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        cancel_noop(self, cx)
    }
}

/// Adapters available on every [`Operation`].
pub trait OperationExt: Operation {
    /// Transforms the output with `f` once the operation completes.
    fn map<F, T>(self, f: F) -> Map<Self, F>
    where
        F: FnOnce(Self::Output) -> T,
        Self: Sized,
    {
        Map::new(self, f)
    }

    /// Runs `f` on the output and continues with the operation it returns,
    /// within the same poll.
    fn then<F, B>(self, f: F) -> Then<Self, F, B>
    where
        F: FnOnce(Self::Output) -> B,
        B: Operation,
        Self: Sized,
    {
        Then::new(self, f)
    }

    /// Wraps the operation as the left side of an [`Either`].
    fn left<R>(self) -> Either<Self, R>
    where
        Self: Sized,
    {
        Either::Left(self)
    }

    /// Wraps the operation as the right side of an [`Either`].
    fn right<L>(self) -> Either<L, Self>
    where
        Self: Sized,
    {
        Either::Right(self)
    }
}

impl<O: Operation + ?Sized> OperationExt for O {}
