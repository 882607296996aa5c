use super::state::TaskState;
use crate::error::{KernelError, TaskFailure};
use crate::runtime::context;
use crate::runtime::core::{Kernel, KernelCore};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

/// Identifier of a task, unique within the kernel that created it.
///
/// Ids are handed out in increasing order starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Bookkeeping shared between a queued task and every handle to it.
pub(crate) struct TaskShared {
    pub(crate) kernel: Weak<KernelCore>,
    pub(crate) id: TaskId,
    pub(crate) name: Option<String>,
    pub(crate) state: Cell<TaskState>,
    pub(crate) cancelled: Cell<bool>,
    pub(crate) resumes: Cell<usize>,

    /// Pivot count of the kernel when the task last stalled.
    pub(crate) stalled_at: Cell<u64>,
}

impl TaskShared {
    pub(crate) fn new(kernel: Weak<KernelCore>, id: TaskId, name: Option<String>) -> Self {
        Self {
            kernel,
            id,
            name,
            state: Cell::new(TaskState::Ready),
            cancelled: Cell::new(false),
            resumes: Cell::new(0),
            stalled_at: Cell::new(0),
        }
    }
}

/// An opaque handle to a task added to a [`Kernel`](crate::Kernel).
///
/// The handle observes the task and can cancel it; it does not own it.
/// Dropping every handle leaves the task running.
#[derive(Clone)]
pub struct TaskHandle {
    pub(crate) shared: Rc<TaskShared>,
}

impl TaskHandle {
    /// Returns the task's identifier.
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Returns the label given when the task was created, if any.
    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    /// Returns the task's current lifecycle state.
    ///
    /// A stalled task reads as [`TaskState::Ready`] as soon as the kernel
    /// pivots its queues, since that moves it into the ready queue.
    pub fn state(&self) -> TaskState {
        let state = self.shared.state.get();

        if state == TaskState::Stalled {
            let pivoted = self
                .shared
                .kernel
                .upgrade()
                .is_some_and(|core| core.pivots() > self.shared.stalled_at.get());

            if pivoted {
                return TaskState::Ready;
            }
        }

        state
    }

    /// Returns `true` once the task completed, failed or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Returns `true` if the task has been marked cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.get()
    }

    /// Marks the task cancelled without touching the kernel's queues.
    ///
    /// The task is dropped the next time the kernel reaches it. Use
    /// [`Kernel::remove`](crate::Kernel::remove) to unlink it right away.
    pub fn cancel(&self) {
        if !self.is_finished() {
            tracing::debug!(task = %self.id(), "task marked cancelled");
            self.shared.cancelled.set(true);
        }
    }

    /// Removes the task from the kernel that owns it.
    ///
    /// Same as [`Kernel::remove`] when the kernel is still alive; otherwise
    /// the task is only marked cancelled.
    pub fn abort(&self) -> bool {
        match self.shared.kernel.upgrade() {
            Some(core) => Kernel::from_core(core).remove(self),
            None => {
                self.cancel();
                false
            }
        }
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for TaskHandle {}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.shared.state.get())
            .finish()
    }
}

/// Result slot shared between a task's completion callbacks and whoever is
/// waiting on it.
pub(crate) type Slot<T> = Rc<RefCell<Option<T>>>;

/// A handle to a task spawned from inside another task.
///
/// A `JoinHandle` is a future that resolves with the spawned task's value
/// once it finishes. While the task is still running, polling the handle
/// stalls the awaiting task, so it is resumed again only after the rest of
/// the current round has run.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    /// Handle to the underlying task.
    pub(crate) task: TaskHandle,

    /// Filled by the task's completion callbacks.
    pub(crate) slot: Slot<Result<T, TaskFailure>>,
}

impl<T> JoinHandle<T> {
    /// Returns the handle of the underlying task.
    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    /// Removes the underlying task from its kernel.
    pub fn abort(&self) -> bool {
        self.task.abort()
    }

    /// Takes the result if the task already finished.
    pub fn try_take(&self) -> Option<Result<T, TaskFailure>> {
        self.slot.borrow_mut().take()
    }

    /// Returns the task's outcome if it finished, without stalling.
    ///
    /// Returns `None` while the task is still queued. Once the result has
    /// been taken (by [`try_take`](Self::try_take), an earlier `try_join` or
    /// awaiting the handle), a completed or failed task reports
    /// [`KernelError::ResultTaken`]; a removed one reports
    /// [`KernelError::Cancelled`].
    pub fn try_join(&self) -> Option<Result<T, KernelError>> {
        if let Some(result) = self.try_take() {
            return Some(result.map_err(KernelError::Unhandled));
        }

        match self.task.state() {
            TaskState::Cancelled => Some(Err(KernelError::Cancelled(self.task.id()))),
            TaskState::Completed | TaskState::Failed => {
                Some(Err(KernelError::ResultTaken(self.task.id())))
            }
            TaskState::Ready | TaskState::Running | TaskState::Stalled => None,
        }
    }
}

impl<T> Future for JoinHandle<T> {
    /// The spawned task's value, or why there is none.
    type Output = Result<T, KernelError>;

    /// Polls the join handle.
    ///
    /// If the task has already finished, its outcome is returned
    /// immediately, as in [`try_join`](Self::try_join). Otherwise the
    /// awaiting task stalls.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.try_join() {
            return Poll::Ready(result);
        }

        context::request_stall();
        cx.waker().wake_by_ref();

        Poll::Pending
    }
}
