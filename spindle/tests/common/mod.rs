#![allow(dead_code)]

use pin_project::pin_project;
use spindle::reactor::Reactor;
use spindle::{Context, Operation, Runtime, RuntimeBuilder, cancel_noop};
use std::cell::Cell;
use std::pin::Pin;
use std::task::Poll;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn virtual_runtime() -> Runtime {
    init_tracing();
    RuntimeBuilder::new().virtual_clock().build()
}

/// Jumps to the earliest deadline and fires every timer due by then,
/// without polling anything.
pub fn advance(reactor: &Reactor, cx: &Context<'_>) -> usize {
    let Some(deadline) = reactor.next_deadline() else {
        return 0;
    };

    reactor.park_until(deadline);

    let mut fired = 0;
    while reactor.fire_next(cx) {
        fired += 1;
    }
    fired
}

/// What happened to one tracked operation.
#[derive(Default)]
pub struct Stats {
    pub created: Cell<u32>,
    pub polls: Cell<u32>,
    pub ready: Cell<u32>,
    pub cancels: Cell<u32>,
}

impl Stats {
    fn bump(cell: &Cell<u32>) {
        cell.set(cell.get() + 1);
    }
}

/// Wraps an operation and checks the driver side of the contract.
///
/// Panics if the operation is polled after it completed or was cancelled,
/// or cancelled after it completed or was already cancelled.
#[pin_project]
pub struct Tracked<'s, O> {
    #[pin]
    op: O,
    stats: &'s Stats,
    finished: bool,
}

impl<'s, O: Operation> Tracked<'s, O> {
    pub fn new(op: O, stats: &'s Stats) -> Self {
        Stats::bump(&stats.created);

        Self {
            op,
            stats,
            finished: false,
        }
    }
}

impl<O: Operation> Operation for Tracked<'_, O> {
    type Output = O::Output;

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<O::Output> {
        let this = self.project();
        assert!(!*this.finished, "tracked operation polled after it finished");

        Stats::bump(&this.stats.polls);

        let poll = this.op.poll(cx);
        if poll.is_ready() {
            Stats::bump(&this.stats.ready);
            *this.finished = true;
        }

        poll
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        let this = self.project();
        assert!(!*this.finished, "tracked operation cancelled after it finished");

        Stats::bump(&this.stats.cancels);
        *this.finished = true;
        this.op.cancel(cx);
    }
}

/// Pending forever, with nothing registered anywhere.
pub struct Never;

impl Operation for Never {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &Context<'_>) -> Poll<()> {
        Poll::Pending
    }

    fn cancel(self: Pin<&mut Self>, cx: &Context<'_>) {
        cancel_noop(self, cx)
    }
}
