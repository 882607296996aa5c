//! Error types produced by the kernel and its combinators.
//!
//! Three kinds of trouble can surface:
//! - [`TaskFailure`]: a task body returned an error or panicked,
//! - [`MisuseError`]: a kernel primitive was called from the wrong place,
//! - [`KernelError`]: what [`Kernel::step`](crate::Kernel::step) and friends
//!   hand back to the host.
//!
//! A task failure that has an `on_error` handler never reaches the host.

use crate::runtime::task::TaskId;

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use thiserror::Error;

/// Where a task failure happened.
///
/// The trace describes the *failing task*, not the scheduler that was
/// driving it, so a failure deep inside some background task can still be
/// attributed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTrace {
    /// Identifier of the failing task.
    pub task: TaskId,

    /// Optional human readable label given at creation time.
    pub name: Option<String>,

    /// How many times the task had been resumed, including the failing one.
    pub resumes: usize,

    /// Name of the kernel that was driving the task.
    pub kernel: String,
}

impl fmt::Display for TaskTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({name})", self.task)?,
            None => write!(f, "{}", self.task)?,
        }

        write!(f, " on {} after {} resume(s)", self.kernel, self.resumes)
    }
}

/// A task body raised instead of finishing.
///
/// Either the body's future resolved to `Err(_)` or a panic unwound out of
/// its `poll`. The failure value is kept type-erased as an [`anyhow::Error`].
#[derive(Debug, Error)]
#[error("{trace} failed: {error:#}")]
pub struct TaskFailure {
    /// The failure value raised by the task.
    pub error: anyhow::Error,

    /// Execution context of the failing task.
    pub trace: TaskTrace,
}

impl TaskFailure {
    pub(crate) fn new(error: anyhow::Error, trace: TaskTrace) -> Self {
        Self { error, trace }
    }

    /// Returns the backtrace of the failing task, if one was recorded.
    ///
    /// For a panic this is the stack at the point of the panic, recorded
    /// before it unwound. For an `Err` it is the backtrace of the error
    /// value: errors built inside the task body (`anyhow!`, `bail!`) capture
    /// the task's own stack, while other error types get one recorded when
    /// the kernel converts them.
    ///
    /// Capture honours `RUST_BACKTRACE`. Returns `None` when nothing was
    /// captured, including on targets where capture is unsupported.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        if let Some(panic) = self.error.downcast_ref::<TaskPanic>() {
            return panic.backtrace();
        }

        let backtrace = self.error.backtrace();

        match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace),
            _ => None,
        }
    }

    /// Returns `true` if the failure came from a panic rather than an `Err`.
    pub fn is_panic(&self) -> bool {
        self.error.downcast_ref::<TaskPanic>().is_some()
    }
}

/// Payload of a panic caught while resuming a task.
#[derive(Debug)]
pub struct TaskPanic {
    message: String,
    backtrace: Option<Backtrace>,
}

impl TaskPanic {
    pub(crate) fn new(message: String, backtrace: Option<Backtrace>) -> Self {
        Self { message, backtrace }
    }

    /// Returns the panic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stack recorded where the panic was raised.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }
}

impl fmt::Display for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

impl std::error::Error for TaskPanic {}

/// A kernel primitive was called somewhere it cannot work.
///
/// These are programmer errors: they are reported immediately at the call
/// site and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MisuseError {
    /// `stall()` (or a combinator built on it) outside of any running task.
    #[error("stall() called outside of a running task")]
    StallOutsideTask,

    /// `wait()` outside of any running task; it could never finish.
    #[error("wait() called outside of a running task")]
    WaitOutsideTask,

    /// `spawn()` outside of any running task; there is no kernel to add to.
    #[error("spawn() called outside of a running task")]
    SpawnOutsideTask,

    /// A kernel was stepped from inside one of its own tasks.
    #[error("kernel stepped from inside one of its own tasks")]
    ReentrantStep,
}

/// Errors returned to the host by the kernel entry points.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A task failed and nobody handled it.
    #[error("unhandled task failure: {0}")]
    Unhandled(#[source] TaskFailure),

    /// A kernel primitive was misused.
    #[error(transparent)]
    Misuse(#[from] MisuseError),

    /// The task being waited on was removed before it produced a result.
    #[error("{0} was cancelled before producing a result")]
    Cancelled(TaskId),

    /// The task finished but its result was already taken from its
    /// [`JoinHandle`](crate::task::JoinHandle).
    #[error("{0} finished but its result was already taken")]
    ResultTaken(TaskId),

    /// The kernel ran out of work before the awaited task finished.
    #[error("kernel ran dry before the awaited task finished")]
    Deadlock,
}

impl KernelError {
    /// Returns the task failure carried by this error, if any.
    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            KernelError::Unhandled(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<TaskFailure> for KernelError {
    fn from(failure: TaskFailure) -> Self {
        KernelError::Unhandled(failure)
    }
}
