//! Core runtime components.
//!
//! This module contains the driver side of the runtime:
//! - the [`Context`] handed to every poll and its wake protocol,
//! - the [`Runtime`] driver and its [`RuntimeBuilder`],
//! - cooperative yielding via [`yield_now`].
//!
//! Waking is coalesced at the root. A leaf that becomes ready does not say
//! which leaf it is; it only asks for the whole tree to be polled again,
//! and the re-poll cascades down to every subtree still pending.

mod context;
mod core;

pub(crate) mod builder;
pub(crate) mod yield_now;

pub use self::context::{Context, DepthGuard, MAX_NESTING_DEPTH, WakeSignal};
pub use self::builder::{DEFAULT_TIMER_CAPACITY, RuntimeBuilder};
pub use self::core::Runtime;
pub use self::yield_now::{YieldNow, yield_now};
