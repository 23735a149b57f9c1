//! Utilities for allocation-free data structures.
//!
//! This module provides low-level utilities used internally by the runtime.
//! In particular, it exposes a fixed-capacity [`Slab`] used by the reactor
//! to hold timer registrations without growing after construction.

mod slab;

pub(crate) use slab::{Key, Slab};
