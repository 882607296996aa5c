//! Core kernel components.
//!
//! This module contains the fundamental building blocks of the kernel,
//! including task execution, queueing, and cooperative suspension.
//!
//! It is responsible for:
//! - resuming tasks one at a time and filing them back,
//! - keeping the ready and stalled queues,
//! - providing the current task frame to combinators,
//! - enabling cooperative multitasking via stalling and yielding.
//!
//! Most users will interact with [`Kernel`](core::Kernel) and the
//! combinators built on top of it rather than with this module directly.

pub(crate) mod context;
mod queue;
mod unwind;

pub(crate) mod builder;
pub(crate) mod core;
pub(crate) mod suspend;

pub mod task;
