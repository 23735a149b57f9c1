use crate::error::fatal;
use crate::operation::Operation;
use crate::reactor::{Callback, Reactor, TimerHandle};
use crate::runtime::Context;

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomPinned;
use std::pin::Pin;
use std::ptr::{self, NonNull};
use std::task::Poll;
use std::time::Duration;

/// Creates a timer that completes after the given duration.
///
/// The timer registers with `reactor` on its first poll, not at
/// construction, so the duration counts from the first poll.
///
/// # Examples
///
/// ```rust
/// use spindle::RuntimeBuilder;
/// use spindle::time::sleep;
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new().virtual_clock().build();
/// runtime.block_on(sleep(runtime.reactor(), Duration::from_millis(10)));
///
/// assert_eq!(runtime.reactor().now(), Duration::from_millis(10));
/// ```
pub fn sleep(reactor: &Reactor, duration: Duration) -> Timer<'_> {
    Timer {
        reactor,
        duration,
        status: Cell::new(Status::NotStarted),
        _pin: PhantomPinned,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Status {
    NotStarted,
    Waiting(TimerHandle),
    /// The reactor fired the timer; the next poll completes.
    Finished,
    /// Ready has been returned.
    Completed,
    Cancelled,
}

/// A leaf operation bound to one reactor timer.
///
/// `Timer` moves through `NotStarted → Waiting → Finished` and then
/// completes. Polling only ever registers the timer; progress comes from the
/// reactor callback, which marks the timer finished and wakes the root.
///
/// While waiting, the reactor holds a non-owning pointer to this timer, so
/// the type is `!Unpin`. The registration is removed when the timer fires,
/// when it is cancelled and, as a last resort, when it is dropped.
#[must_use = "operations do nothing unless polled"]
pub struct Timer<'r> {
    reactor: &'r Reactor,
    duration: Duration,
    status: Cell<Status>,
    _pin: PhantomPinned,
}

impl Timer<'_> {
    /// The requested duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether the reactor has fired this timer.
    pub fn is_elapsed(&self) -> bool {
        matches!(self.status.get(), Status::Finished | Status::Completed)
    }

    /// Reactor callback.
    ///
    /// # Safety
    ///
    /// `data` must point to the `status` cell of a pinned, live `Timer`.
    unsafe fn fire(data: NonNull<()>, cx: &Context<'_>) {
        // Safety: registered by `poll` from the status cell of a pinned
        // timer, which deregisters on cancel and on drop
        let status = unsafe { data.cast::<Cell<Status>>().as_ref() };

        status.set(Status::Finished);
        cx.wake();
    }
}

impl Operation for Timer<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &Context<'_>) -> Poll<()> {
        let this = self.into_ref().get_ref();
        tracing::trace!(timer = ?this, "Timer::poll");

        match this.status.get() {
            Status::NotStarted => {
                if !ptr::eq(this.reactor, cx.reactor()) {
                    fatal("Timer polled with a context of another reactor");
                }

                // Safety: `status` lives inside this pinned timer and the
                // registration is removed before the timer can move or drop
                let callback =
                    unsafe { Callback::new(NonNull::from(&this.status).cast(), Self::fire) };

                match this.reactor.register_timer(this.duration, callback) {
                    Ok(handle) => {
                        this.status.set(Status::Waiting(handle));
                        Poll::Pending
                    }
                    Err(err) => fatal(format_args!("timer registration failed: {err}")),
                }
            }
            Status::Waiting(_) => Poll::Pending,
            Status::Finished => {
                this.status.set(Status::Completed);
                Poll::Ready(())
            }
            Status::Completed => fatal("Timer polled after completion"),
            Status::Cancelled => fatal("Timer polled after cancellation"),
        }
    }

    fn cancel(self: Pin<&mut Self>, _cx: &Context<'_>) {
        let this = self.into_ref().get_ref();

        if let Status::Waiting(handle) = this.status.get() {
            this.reactor.cancel_timer(handle);
            this.status.set(Status::Cancelled);
            tracing::trace!(?handle, "Timer::cancel");
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        if let Status::Waiting(handle) = self.status.get() {
            tracing::trace!(?handle, "Timer::drop deregistering");
            self.reactor.cancel_timer(handle);
        }
    }
}

impl fmt::Debug for Timer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("duration", &self.duration)
            .field("status", &self.status.get())
            .field("addr", &ptr::from_ref(self))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::ClockKind;
    use crate::runtime::WakeSignal;

    use std::pin::pin;

    #[test]
    fn pending_until_fired_then_ready() {
        let reactor = Reactor::new(ClockKind::Virtual, 4);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let mut timer = pin!(sleep(&reactor, Duration::from_millis(30)));

        assert!(timer.as_mut().poll(&cx).is_pending());
        assert_eq!(reactor.pending(), 1);

        reactor.park_until(Duration::from_millis(29));
        assert!(!reactor.fire_next(&cx));
        assert!(timer.as_mut().poll(&cx).is_pending());

        reactor.park_until(Duration::from_millis(30));
        assert!(reactor.fire_next(&cx));
        assert!(signal.take());
        assert!(timer.is_elapsed());
        assert_eq!(reactor.pending(), 0);

        assert!(timer.as_mut().poll(&cx).is_ready());
    }

    #[test]
    fn cancel_while_waiting_deregisters() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let mut timer = pin!(sleep(&reactor, Duration::from_millis(5)));
        assert!(timer.as_mut().poll(&cx).is_pending());

        timer.as_mut().cancel(&cx);
        assert_eq!(reactor.pending(), 0);

        reactor.park_until(Duration::from_millis(5));
        assert!(!reactor.fire_next(&cx));
        assert!(!signal.is_requested());
    }

    #[test]
    fn cancel_before_first_poll_is_noop() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let mut timer = pin!(sleep(&reactor, Duration::from_millis(5)));
        timer.as_mut().cancel(&cx);

        assert_eq!(reactor.pending(), 0);
    }

    #[test]
    fn drop_while_waiting_deregisters() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        {
            let mut timer = pin!(sleep(&reactor, Duration::from_millis(5)));
            assert!(timer.as_mut().poll(&cx).is_pending());
            assert_eq!(reactor.pending(), 1);
        }

        assert_eq!(reactor.pending(), 0);
    }

    #[test]
    #[should_panic(expected = "timer registration failed")]
    fn registration_failure_is_fatal() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let mut first = pin!(sleep(&reactor, Duration::from_millis(5)));
        let mut second = pin!(sleep(&reactor, Duration::from_millis(5)));

        let _ = first.as_mut().poll(&cx);
        let _ = second.as_mut().poll(&cx);
    }

    #[test]
    #[should_panic(expected = "Timer polled after completion")]
    fn poll_after_ready_is_fatal() {
        let reactor = Reactor::new(ClockKind::Virtual, 1);
        let signal = WakeSignal::new();
        let cx = Context::new(&reactor, &signal);

        let mut timer = pin!(sleep(&reactor, Duration::ZERO));
        let _ = timer.as_mut().poll(&cx);
        reactor.fire_next(&cx);

        assert!(timer.as_mut().poll(&cx).is_ready());
        let _ = timer.as_mut().poll(&cx);
    }
}
