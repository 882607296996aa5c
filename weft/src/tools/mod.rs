//! Helpers for writing task bodies.
//!
//! This module provides small combinators that turn common polling and
//! long-loop patterns into straight-line task code:
//! - [`value`] waits for a producer to return something,
//! - [`wrap_iterator`] spreads a tight loop over several kernel turns.

mod paced;
mod value;

#[doc(inline)]
pub use paced::{Paced, wrap_iterator};

#[doc(inline)]
pub use value::value;
