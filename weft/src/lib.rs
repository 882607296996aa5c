//! # Weft
//!
//! **Weft** is a single-threaded cooperative task kernel for Rust, designed
//! to run many long-lived units of work inside a host application's update
//! loop without ever blocking it.
//!
//! Unlike general-purpose async runtimes, Weft has no reactor, no threads
//! and no wakers: the host hands the kernel a time budget every tick and the
//! kernel resumes tasks round-robin until the budget is spent. A task runs
//! until it finishes, fails, or voluntarily suspends:
//!
//! - **yielding** puts it back at the end of the ready queue,
//! - **stalling** parks it until every other ready task had its turn, which
//!   is how tasks wait on time or on each other without busy-polling.
//!
//! On top of that the crate offers:
//!
//! - **Timers**: [`wait`](time::wait), `add_timeout` and `add_interval`
//! - **Fan-out/fan-in**: [`spawn`](task::spawn), [`await_all`](task::await_all)
//!   and the [`await_all!`] macro
//! - **Polling helpers**: [`value`](tools::value) and
//!   [`wrap_iterator`](tools::wrap_iterator)
//! - **Failure isolation**: a task that fails is reported to its `on_error`
//!   handler, or returned to the host as a [`KernelError`]; the kernel keeps
//!   running either way
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use weft::Kernel;
//! use weft::time::wait;
//!
//! let kernel = Kernel::new();
//!
//! kernel
//!     .task(async {
//!         wait(Duration::from_millis(5))?.await;
//!         Ok::<_, anyhow::Error>("done")
//!     })
//!     .on_complete(|value| println!("task finished: {value}"))
//!     .add();
//!
//! // Once per frame of the host loop:
//! while !kernel.is_empty() {
//!     kernel.run_for(Duration::from_millis(2), true).unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Task handles, suspension points and fan-out/fan-in
//! - [`time`]: Clocks, `wait`, and timers
//! - [`tools`]: Polling helpers for task bodies
//! - [`logging`]: Optional log output for hosts
//!
//! ## Getting Started
//!
//! Add Weft to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! weft = { git = "https://github.com/Nebula-ecosystem/Weft", package = "weft" }
//! ```

mod runtime;

pub mod error;
pub mod logging;
pub mod time;
pub mod tools;

pub use error::{KernelError, MisuseError, TaskFailure, TaskPanic, TaskTrace};
pub use runtime::builder::KernelBuilder;
pub use runtime::core::Kernel;
pub use runtime::task;

pub use weft_macros::*;

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
}
