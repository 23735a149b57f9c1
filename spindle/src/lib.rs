//! # Spindle
//!
//! **Spindle** is a single-task, poll-based async core for the **Nebula**
//! ecosystem, aimed at targets where the heap is off limits once the system
//! is running.
//!
//! Where a general-purpose runtime boxes futures and spawns tasks, Spindle
//! drives exactly one root operation on the calling thread. Every operation
//! tree is a concrete nested type whose storage is laid out at compile time,
//! pinned once by the driver and never moved again. Cancellation is
//! explicit and synchronous: an operation that loses a race releases its
//! timer before the race returns.
//!
//! Spindle offers:
//!
//! - An [`Operation`] trait with `poll` **and** `cancel`
//! - A **reactor** with a fixed-size timer table and a system or virtual clock
//! - **Sequential composition** written with `.await` through [`sequence!`]
//! - **Races** with cancel-on-completion, plus joins, timeouts and retries
//! - **Ergonomic macros** like `#[spindle::main]`, `#[spindle::test]`,
//!   [`join!`] and [`select!`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spindle::reactor::Reactor;
//! use spindle::time::sleep;
//! use std::time::Duration;
//!
//! #[spindle::main]
//! async fn main(reactor: &Reactor) {
//!     println!("waiting");
//!     sleep(reactor, Duration::from_millis(100)).await;
//!     println!("done");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`combinator`] — Sequence, race, join and small adapters
//! - [`reactor`] — Timer registration and clocks
//! - [`time`] — Sleep, timeout and instrumentation
//! - [`tools`] — Utilities like retry mechanisms
//!
//! ## Getting Started
//!
//! Add Spindle to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! spindle = { git = "https://github.com/Nebula-ecosystem/Spindle", package = "spindle" }
//! ```

extern crate self as spindle;

mod error;
mod operation;
mod runtime;
mod utils;

pub mod combinator;
pub mod reactor;
pub mod time;
pub mod tools;

pub use error::{RegisterError, RunError, fatal};
pub use operation::{Operation, OperationExt, cancel_noop, cancel_unimplemented};
pub use reactor::ClockKind;
pub use runtime::{
    Context, DEFAULT_TIMER_CAPACITY, DepthGuard, MAX_NESTING_DEPTH, Runtime, RuntimeBuilder,
    WakeSignal, YieldNow, yield_now,
};

pub use spindle_macros::{join, main, select, sequence, test};

#[doc(hidden)]
pub mod __private {
    pub use pin_project_lite::pin_project;
}
