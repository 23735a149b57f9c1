use crate::error::fatal;
use crate::operation::Operation;
use crate::runtime::Context;

use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Poll, ready};

/// Operation returned by [`OperationExt::map`](crate::OperationExt::map).
#[pin_project(project = MapProj, project_replace = MapProjReplace)]
#[derive(Debug)]
pub enum Map<O, F> {
    Incomplete {
        #[pin]
        op: O,
        f: F,
    },
    Complete,
    Cancelled,
}

impl<O, F> Map<O, F> {
    pub(crate) fn new(op: O, f: F) -> Self {
        Map::Incomplete { op, f }
    }
}

impl<O, F, T> Operation for Map<O, F>
where
    O: Operation,
    F: FnOnce(O::Output) -> T,
{
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<T> {
        match self.as_mut().project() {
            MapProj::Incomplete { op, .. } => {
                let output = ready!(op.poll(cx));

                match self.project_replace(Map::Complete) {
                    MapProjReplace::Incomplete { f, .. } => Poll::Ready(f(output)),
                    _ => unreachable!(),
                }
            }
            MapProj::Complete => fatal("Map polled after completion"),
            MapProj::Cancelled => fatal("Map polled after cancellation"),
        }
    }

    fn cancel(mut self: Pin<&mut Self>, cx: &Context<'_>) {
        if let MapProj::Incomplete { op, .. } = self.as_mut().project() {
            op.cancel(cx);
            self.set(Map::Cancelled);
        }
    }
}
