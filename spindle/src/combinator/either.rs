use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::Poll;

/// One of two operations producing the same output.
///
/// Used wherever the next step of a sequence depends on a runtime value,
/// for example when a failed step short-circuits the rest of the sequence.
#[pin_project(project = EitherProj)]
#[derive(Debug)]
pub enum Either<L, R> {
    Left(#[pin] L),
    Right(#[pin] R),
}

impl<L, R> Operation for Either<L, R>
where
    L: Operation,
    R: Operation<Output = L::Output>,
{
    type Output = L::Output;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            EitherProj::Left(op) => op.poll(cx),
            EitherProj::Right(op) => op.poll(cx),
        }
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        match self.project() {
            EitherProj::Left(op) => op.cancel(cx),
            EitherProj::Right(op) => op.cancel(cx),
        }
    }
}
