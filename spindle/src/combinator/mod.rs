//! Operations built from other operations.
//!
//! - [`Sequence`] runs steps one after another, resuming exactly where
//!   the previous poll paused. The [`sequence!`](crate::sequence) macro
//!   writes the flat state machine ([`Steps`] over a [`StepSet`]) for you.
//!   [`Then`] chains a single step by hand.
//! - [`Race`] polls a fixed set of children and completes with the first
//!   one ready, cancelling the rest.
//! - [`Join`] completes once every child has.
//! - [`Map`], [`Either`] and [`Ready`] are the small adapters the others
//!   are assembled from.
//!
//! Every combinator stores its children inline. Nothing here allocates.

mod either;
mod join;
mod map;
mod race;
mod ready;
mod sequence;
mod steps;
mod then;

pub use either::Either;
pub use join::{Join, JoinSet, MaybeDone, join};
pub use map::Map;
pub use race::{Race, RaceSet, race};
pub use ready::{Ready, ready};
pub use sequence::Sequence;
pub use steps::{StepSet, Steps};
pub use then::Then;
