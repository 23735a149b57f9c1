use super::clock::{Clock, ClockKind};
use super::timer::{Callback, TimerEntry, TimerHandle};
use crate::error::RegisterError;
use crate::runtime::Context;
use crate::utils::Slab;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Duration;

/// The reactor.
///
/// The reactor owns every timer registration of a runtime. It is
/// responsible for:
/// - accepting and cancelling timer registrations,
/// - telling the driver when the next timer is due,
/// - waiting for that deadline on its clock,
/// - firing expired timers one at a time.
///
/// The timer table is allocated once, with a fixed capacity, when the
/// reactor is created. Registering beyond that capacity fails with
/// [`RegisterError::Full`] instead of allocating.
///
/// A reactor belongs to one scheduling thread; it is neither `Send` nor
/// `Sync`.
pub struct Reactor {
    /// Time source for deadlines.
    clock: Clock,

    /// Live timer registrations.
    timers: RefCell<Slab<TimerEntry>>,

    /// Sequence number handed to the next registration.
    next_seq: Cell<u64>,
}

impl Reactor {
    /// Creates a reactor able to hold `capacity` timers at once.
    pub(crate) fn new(clock: ClockKind, capacity: usize) -> Self {
        Self {
            clock: Clock::new(clock),
            timers: RefCell::new(Slab::with_capacity(capacity)),
            next_seq: Cell::new(0),
        }
    }

    /// Current time, as an offset from the reactor's clock origin.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// The kind of clock driving this reactor.
    pub fn clock_kind(&self) -> ClockKind {
        self.clock.kind()
    }

    /// Registers `callback` to fire once `duration` has elapsed.
    ///
    /// The callback fires at most once, never after
    /// [`cancel_timer`](Self::cancel_timer) returned for its handle, and
    /// always from inside [`fire_next`](Self::fire_next).
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError::Full`] when every slot of the timer table
    /// is in use.
    pub fn register_timer(
        &self,
        duration: Duration,
        callback: Callback,
    ) -> Result<TimerHandle, RegisterError> {
        let deadline = self.now().saturating_add(duration);
        let seq = self.next_seq.get();

        let mut timers = self.timers.borrow_mut();
        let capacity = timers.capacity();

        let key = timers
            .insert(TimerEntry {
                deadline,
                seq,
                callback,
            })
            .map_err(|_| RegisterError::Full { capacity })?;

        self.next_seq.set(seq + 1);

        tracing::debug!(?key, ?deadline, "timer registered");

        Ok(TimerHandle(key))
    }

    /// Deregisters a timer so that its callback can never fire.
    ///
    /// Returns `false` if the handle is stale (the timer already fired or
    /// was already cancelled).
    pub fn cancel_timer(&self, handle: TimerHandle) -> bool {
        let removed = self.timers.borrow_mut().remove(handle.0).is_some();

        tracing::debug!(key = ?handle.0, removed, "timer cancelled");

        removed
    }

    /// Number of live timer registrations.
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Deadline of the earliest live timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers
            .borrow()
            .iter()
            .map(|(_, entry)| entry)
            .min()
            .map(|entry| entry.deadline)
    }

    /// Waits on the reactor clock until `deadline`.
    ///
    /// On the system clock this puts the thread to sleep; on the virtual
    /// clock it advances time to the deadline immediately.
    pub fn park_until(&self, deadline: Duration) {
        tracing::trace!(?deadline, now = ?self.now(), "parking");
        self.clock.park_until(deadline);
    }

    /// Fires the earliest expired timer, if there is one.
    ///
    /// The registration is removed before its callback runs, so the
    /// callback observes its handle as already stale. Returns `true` if a
    /// callback was invoked.
    pub fn fire_next(&self, cx: &Context<'_>) -> bool {
        let now = self.now();

        let callback = {
            let mut timers = self.timers.borrow_mut();

            let Some(key) = timers
                .iter()
                .filter(|(_, entry)| entry.deadline <= now)
                .min_by(|(_, a), (_, b)| a.cmp(b))
                .map(|(key, _)| key)
            else {
                return false;
            };

            match timers.remove(key) {
                Some(entry) => entry.callback,
                None => return false,
            }
        };

        tracing::trace!(?now, ?callback, "timer fired");

        // Safety: a registered callback stays valid until it fires or is
        // cancelled, and we just removed it from the table so it fires once
        unsafe { callback.invoke(cx) };

        true
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("clock", &self.clock.kind())
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}
