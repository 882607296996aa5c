use crate::runtime::core::Kernel;
use crate::runtime::task::TaskId;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Execution context of the task currently being resumed.
pub(crate) struct Frame {
    /// Kernel driving the task.
    pub(crate) kernel: Kernel,

    /// Task being resumed.
    pub(crate) task: TaskId,

    /// Set when the task asks to be filed into the stalled queue.
    stall: Cell<bool>,
}

impl Frame {
    pub(crate) fn new(kernel: Kernel, task: TaskId) -> Self {
        Self {
            kernel,
            task,
            stall: Cell::new(false),
        }
    }

    /// Returns `true` if the task asked to stall during this resume.
    pub(crate) fn stall_requested(&self) -> bool {
        self.stall.get()
    }
}

thread_local! {
    /// Thread-local frame of the task being resumed.
    ///
    /// This is set by the kernel around each resume and allows the
    /// combinators (`stall`, `wait`, `spawn`, ...) to reach the running
    /// task and its kernel without explicit parameter passing.
    static CURRENT_FRAME: RefCell<Option<Rc<Frame>>> = const { RefCell::new(None) };
}

/// Installs `frame` as the current task frame for the duration of `f`.
///
/// The previous frame is restored afterwards, so a task may drive another
/// kernel without losing its own context.
pub(crate) fn enter<R>(frame: Rc<Frame>, f: impl FnOnce() -> R) -> R {
    CURRENT_FRAME.with(|cell| {
        let prev = cell.replace(Some(frame));

        let out = f();

        cell.replace(prev);

        out
    })
}

/// Runs `f` against the current task frame, if there is one.
fn with_frame<R>(f: impl FnOnce(&Frame) -> R) -> Option<R> {
    let frame = CURRENT_FRAME.with(|cell| cell.borrow().clone());
    frame.map(|frame| f(&frame))
}

/// Returns `true` when called from inside a running task.
pub(crate) fn in_task() -> bool {
    with_frame(|_| ()).is_some()
}

/// Returns the kernel driving the current task.
pub(crate) fn current_kernel() -> Option<Kernel> {
    with_frame(|frame| frame.kernel.clone())
}

/// Returns the id of the current task.
pub(crate) fn current_task() -> Option<TaskId> {
    with_frame(|frame| frame.task)
}

/// Asks for the current task to be filed into the stalled queue once its
/// resume returns. Returns `false` outside of a task.
pub(crate) fn request_stall() -> bool {
    with_frame(|frame| frame.stall.set(true)).is_some()
}
