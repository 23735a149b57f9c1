//! Reactor core and timer handling.
//!
//! The reactor is the readiness source that leaf operations register with.
//! It is responsible for:
//! - keeping a fixed-size table of timer registrations,
//! - reporting the nearest deadline to the driver,
//! - invoking the callback of each expired timer exactly once.
//!
//! Callbacks run on the scheduling thread, from inside
//! [`Reactor::fire_next`], and usually end by calling
//! [`Context::wake`](crate::Context::wake).
//!
//! Most users only pass a `&Reactor` to [`sleep`](crate::time::sleep);
//! the registration API is public so that other leaf operations can be
//! built on top of it.

mod clock;
mod core;
mod timer;

pub use self::clock::ClockKind;
pub use self::core::Reactor;
pub use self::timer::{Callback, TimerHandle};
