//! Task primitives.
//!
//! This module defines how the kernel represents tasks and the combinators
//! task bodies use to cooperate with it.
//!
//! It includes:
//! - task handles, ids and lifecycle states,
//! - the builder used to attach callbacks before a task is queued,
//! - suspension points ([`stall`], [`yield_now`]),
//! - fan-out/fan-in helpers ([`spawn`], [`await_all`], [`await_one`],
//!   [`await_each`], [`await_call`]).
//!
//! Everything here that needs a kernel finds it through the task currently
//! being resumed, so these functions only work inside task bodies.

pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod join;
pub(crate) mod state;

pub(crate) use self::core::{Resumable, Signal, Task};
pub(crate) use handle::TaskShared;

pub use self::core::TaskBuilder;
pub use handle::{JoinHandle, TaskHandle, TaskId};
pub use join::{AbortGuard, await_all, await_call, await_each, await_one, spawn};
pub use state::TaskState;

pub use crate::runtime::suspend::{Stall, stall, yield_now};
