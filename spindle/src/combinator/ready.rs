use crate::error::fatal;
use crate::operation::{Operation, cancel_noop};
use crate::runtime::Context;

use std::pin::Pin;
use std::task::Poll;

/// Operation returned by [`ready`].
#[derive(Debug, Clone)]
pub struct Ready<T>(Option<T>);

impl<T> Unpin for Ready<T> {}

impl<T> Operation for Ready<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &Context<'_>) -> Poll<T> {
        match self.get_mut().0.take() {
            Some(value) => Poll::Ready(value),
            None => fatal("Ready polled after completion"),
        }
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        cancel_noop(self, cx)
    }
}

/// Creates an operation that completes with `value` on its first poll.
pub fn ready<T>(value: T) -> Ready<T> {
    Ready(Some(value))
}
