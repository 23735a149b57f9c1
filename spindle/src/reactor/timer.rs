use crate::runtime::Context;
use crate::utils::Key;

use std::cmp::Ordering;
use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

/// Identifies one timer registration on a [`Reactor`](super::Reactor).
///
/// Handles are cheap to copy. Once the timer fires or is cancelled the
/// handle goes stale, and cancelling a stale handle does nothing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TimerHandle(pub(crate) Key);

/// The function a reactor invokes when a timer expires.
///
/// A callback is a type-erased pointer plus the function that knows how to
/// interpret it, in the style of a raw waker. The pointer is non-owning:
/// the reactor never frees or moves what it points to.
#[derive(Copy, Clone)]
pub struct Callback {
    data: NonNull<()>,
    fire: unsafe fn(NonNull<()>, &Context<'_>),
}

impl Callback {
    /// Creates a callback that invokes `fire(data, cx)`.
    ///
    /// # Safety
    ///
    /// `data` must stay valid, and at the same address, until the callback
    /// has fired or its registration has been cancelled with
    /// [`Reactor::cancel_timer`](super::Reactor::cancel_timer). `fire`
    /// must be sound to call with `data` on the scheduling thread.
    pub unsafe fn new(data: NonNull<()>, fire: unsafe fn(NonNull<()>, &Context<'_>)) -> Self {
        Self { data, fire }
    }

    /// # Safety
    ///
    /// The contract of [`Callback::new`] must still hold.
    pub(crate) unsafe fn invoke(self, cx: &Context<'_>) {
        // Safety: forwarded from the caller
        unsafe { (self.fire)(self.data, cx) }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// An entry in the reactor timer table.
///
/// `TimerEntry` represents a scheduled callback at a specific deadline.
/// Entries are ordered by deadline, then by registration order, so that
/// timers sharing a deadline expire first-registered first.
pub(crate) struct TimerEntry {
    /// Offset from the reactor's clock origin at which the timer fires.
    pub(crate) deadline: Duration,

    /// Registration sequence number; breaks ties between equal deadlines.
    pub(crate) seq: u64,

    /// Invoked once when the deadline is reached.
    pub(crate) callback: Callback,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, earliest first.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
