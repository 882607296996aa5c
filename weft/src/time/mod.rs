//! Time utilities.
//!
//! This module provides the kernel's notion of time and the combinators
//! built on it.
//!
//! It includes:
//! - the [`Clock`] trait with [`SystemClock`] and [`ManualClock`],
//! - [`wait`] for stalling a task until a duration has elapsed,
//! - timers on [`Kernel`](crate::Kernel): `add_timeout` and `add_interval`.

mod clock;
mod timer;
mod wait;

#[doc(inline)]
pub use clock::{Clock, ManualClock, SystemClock};

#[doc(inline)]
pub use wait::{Wait, wait};
