use super::builder::KernelBuilder;
use super::context::{self, Frame};
use super::queue::RunQueues;
use super::unwind;
use super::task::{Resumable, Signal, Task, TaskBuilder, TaskHandle, TaskId, TaskShared, TaskState};
use crate::error::{KernelError, MisuseError, TaskFailure, TaskPanic, TaskTrace};
use crate::time::Clock;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// State owned by a kernel and shared by its clones.
pub(crate) struct KernelCore {
    /// Label used in logs and failure traces.
    name: String,

    /// Monotonic time source.
    clock: Rc<dyn Clock>,

    /// Ready and stalled queues.
    queues: RefCell<RunQueues>,

    /// Task currently being resumed, off both queues.
    running: Cell<Option<TaskId>>,

    /// Next task id to hand out.
    next_id: Cell<u64>,
}

impl KernelCore {
    /// Number of times the stalled queue became the ready queue.
    pub(crate) fn pivots(&self) -> u64 {
        self.queues.borrow().pivots()
    }
}

/// A single-threaded cooperative task kernel.
///
/// The kernel owns two FIFO queues of tasks. Each [`step`](Self::step)
/// resumes the task at the front of the ready queue once and files it back
/// according to what it asked for:
/// - still running: back of the ready queue,
/// - stalled: back of the stalled queue, resumed after the current round,
/// - finished, failed or cancelled: dropped.
///
/// A host embeds the kernel by calling [`run_for`](Self::run_for) once per
/// tick with a time budget.
///
/// `Kernel` is a cheap handle: clones share the same queues. It is not
/// `Send`; every task runs on the thread that owns the kernel.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use weft::Kernel;
/// use weft::task::stall;
///
/// let kernel = Kernel::new();
///
/// kernel.add(async {
///     stall()?.await;
///     Ok::<_, anyhow::Error>(())
/// });
///
/// let steps = kernel.run_for(Duration::from_secs(1), false).unwrap();
/// assert_eq!(steps, 2);
/// assert!(kernel.is_empty());
/// ```
#[derive(Clone)]
pub struct Kernel {
    core: Rc<KernelCore>,
}

impl Kernel {
    /// Creates a kernel with the default configuration.
    ///
    /// See [`KernelBuilder`] to change the clock or the kernel's name.
    pub fn new() -> Self {
        KernelBuilder::new().build()
    }

    /// Returns a builder to configure a new kernel.
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub(crate) fn with_parts(name: String, clock: Rc<dyn Clock>) -> Self {
        unwind::install_hook();

        Self {
            core: Rc::new(KernelCore {
                name,
                clock,
                queues: RefCell::new(RunQueues::new()),
                running: Cell::new(None),
                next_id: Cell::new(1),
            }),
        }
    }

    pub(crate) fn from_core(core: Rc<KernelCore>) -> Self {
        Self { core }
    }

    /// Returns the kernel driving the task currently being resumed.
    ///
    /// Returns `None` outside of a task.
    pub fn current() -> Option<Kernel> {
        context::current_kernel()
    }

    /// Returns the id of the task currently being resumed, if any.
    pub fn current_task() -> Option<TaskId> {
        context::current_task()
    }

    /// Returns the kernel's name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Returns the kernel's clock.
    pub fn clock(&self) -> Rc<dyn Clock> {
        self.core.clock.clone()
    }

    /// Adds a task whose body is `future`.
    ///
    /// The task is appended to the back of the ready queue. A failure of a
    /// task added this way is escalated out of [`step`](Self::step); use
    /// [`task`](Self::task) to attach callbacks.
    pub fn add<Fut, T, E>(&self, future: Fut) -> TaskHandle
    where
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<anyhow::Error> + 'static,
        T: 'static,
    {
        self.task(future).add()
    }

    /// Adds a task whose body is `body(args)`.
    ///
    /// `body` is called on the task's first resume, not now.
    pub fn call<F, A, Fut, T, E>(&self, body: F, args: A) -> TaskHandle
    where
        F: FnOnce(A) -> Fut + 'static,
        A: 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<anyhow::Error> + 'static,
        T: 'static,
    {
        self.call_task(body, args).add()
    }

    /// Starts configuring a task whose body is `future`.
    pub fn task<Fut, T, E>(
        &self,
        future: Fut,
    ) -> TaskBuilder<'_, impl FnOnce(()) -> Fut + 'static, (), T>
    where
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<anyhow::Error> + 'static,
        T: 'static,
    {
        TaskBuilder::new(self, move |()| future, ())
    }

    /// Starts configuring a task whose body is `body(args)`.
    pub fn call_task<F, A, Fut, T, E>(&self, body: F, args: A) -> TaskBuilder<'_, F, A, T>
    where
        F: FnOnce(A) -> Fut + 'static,
        A: 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<anyhow::Error> + 'static,
        T: 'static,
    {
        TaskBuilder::new(self, body, args)
    }

    /// Wraps `body` into a task and appends it to the ready queue.
    pub(crate) fn insert(&self, name: Option<String>, body: Box<dyn Resumable>) -> TaskHandle {
        let id = TaskId(self.core.next_id.get());
        self.core.next_id.set(id.0 + 1);

        let shared = Rc::new(TaskShared::new(Rc::downgrade(&self.core), id, name));

        tracing::debug!(
            kernel = %self.core.name,
            task = %id,
            name = shared.name.as_deref().unwrap_or(""),
            "task added"
        );

        self.core
            .queues
            .borrow_mut()
            .push_ready(Task::new(shared.clone(), body));

        TaskHandle { shared }
    }

    /// Cancels a task.
    ///
    /// If the task is the one currently being resumed, it is dropped as soon
    /// as that resume returns instead of being queued again. Otherwise it is
    /// unlinked from the ready or stalled queue right away.
    ///
    /// Returns `true` if the task was still alive in this kernel. A removed
    /// task never has its `on_complete` or `on_error` called, except when it
    /// raises during the resume it was cancelled in.
    pub fn remove(&self, handle: &TaskHandle) -> bool {
        let shared = &handle.shared;

        if !std::ptr::eq(shared.kernel.as_ptr(), Rc::as_ptr(&self.core))
            || shared.state.get().is_terminal()
        {
            return false;
        }

        shared.cancelled.set(true);

        if self.core.running.get() == Some(shared.id) {
            tracing::debug!(kernel = %self.core.name, task = %shared.id, "running task cancelled");
            return true;
        }

        let removed = self.core.queues.borrow_mut().remove(shared.id);

        match removed {
            Some(task) => {
                task.shared.state.set(TaskState::Cancelled);
                tracing::debug!(kernel = %self.core.name, task = %shared.id, "task removed");

                // Dropped outside of the queue borrow: the body may remove
                // other tasks from its destructors.
                drop(task);
                true
            }
            None => false,
        }
    }

    /// Cancels every queued task.
    ///
    /// Returns the number of tasks dropped.
    pub fn clear(&self) -> usize {
        let tasks = self.core.queues.borrow_mut().drain();
        let count = tasks.len();

        for task in &tasks {
            task.shared.cancelled.set(true);
            task.shared.state.set(TaskState::Cancelled);
        }

        drop(tasks);

        if count > 0 {
            tracing::debug!(kernel = %self.core.name, count, "kernel cleared");
        }

        count
    }

    /// Resumes the next task once.
    ///
    /// Returns `Ok(false)` when both queues are empty, `Ok(true)` after one
    /// unit of work (dropping a cancelled task counts as one).
    ///
    /// # Errors
    ///
    /// - [`KernelError::Unhandled`] if the task raised and has no `on_error`.
    ///   The task is dropped; the kernel stays usable.
    /// - [`KernelError::Misuse`] if called from inside one of this kernel's
    ///   own tasks.
    pub fn step(&self) -> Result<bool, KernelError> {
        if self.core.running.get().is_some() {
            return Err(MisuseError::ReentrantStep.into());
        }

        let next = self.core.queues.borrow_mut().pop();

        let Some(mut task) = next else {
            return Ok(false);
        };

        if task.shared.cancelled.get() {
            task.shared.state.set(TaskState::Cancelled);
            tracing::debug!(kernel = %self.core.name, task = %task.id(), "dropped cancelled task");
            return Ok(true);
        }

        task.shared.state.set(TaskState::Running);
        self.core.running.set(Some(task.id()));

        let signal = self.resume(&mut task);

        self.core.running.set(None);

        self.file(task, signal)
    }

    /// Resumes `task` once inside its own frame and span.
    fn resume(&self, task: &mut Task) -> Signal {
        let shared = task.shared.clone();
        shared.resumes.set(shared.resumes.get() + 1);

        let frame = Rc::new(Frame::new(self.clone(), shared.id));
        let span = tracing::trace_span!(
            "task",
            kernel = %self.core.name,
            id = %shared.id,
            name = shared.name.as_deref().unwrap_or(""),
        );

        let mut cx = Context::from_waker(Waker::noop());

        let outcome = context::enter(frame.clone(), || {
            let _entered = span.enter();
            panic::catch_unwind(AssertUnwindSafe(|| task.body.resume(&mut cx)))
        });

        match outcome {
            Ok(Poll::Pending) if frame.stall_requested() => Signal::Stall,
            Ok(Poll::Pending) => Signal::Continue,
            Ok(Poll::Ready(Ok(()))) => Signal::Complete,
            Ok(Poll::Ready(Err(error))) => Signal::Fail(self.failure(&shared, error)),
            Err(payload) => {
                let caught = TaskPanic::new(panic_message(payload.as_ref()), unwind::take_backtrace());
                let error = anyhow::Error::new(caught);
                Signal::Fail(self.failure(&shared, error))
            }
        }
    }

    /// Files a resumed task according to its signal.
    fn file(&self, mut task: Task, signal: Signal) -> Result<bool, KernelError> {
        let id = task.id();

        match signal {
            Signal::Fail(failure) => {
                task.shared.state.set(TaskState::Failed);

                match task.body.recover(failure) {
                    Ok(()) => {
                        tracing::debug!(kernel = %self.core.name, task = %id, "task failure handled");
                        Ok(true)
                    }
                    Err(failure) => {
                        tracing::warn!(
                            kernel = %self.core.name,
                            task = %id,
                            %failure,
                            "unhandled task failure"
                        );
                        Err(KernelError::Unhandled(failure))
                    }
                }
            }
            _ if task.shared.cancelled.get() => {
                task.shared.state.set(TaskState::Cancelled);
                tracing::debug!(kernel = %self.core.name, task = %id, "dropped task cancelled mid-resume");
                Ok(true)
            }
            Signal::Complete => {
                task.shared.state.set(TaskState::Completed);
                tracing::debug!(kernel = %self.core.name, task = %id, "task completed");
                task.body.complete();
                Ok(true)
            }
            Signal::Stall => {
                let mut queues = self.core.queues.borrow_mut();

                task.shared.state.set(TaskState::Stalled);
                task.shared.stalled_at.set(queues.pivots());
                queues.push_stalled(task);
                Ok(true)
            }
            Signal::Continue => {
                task.shared.state.set(TaskState::Ready);
                self.core.queues.borrow_mut().push_ready(task);
                Ok(true)
            }
        }
    }

    fn failure(&self, shared: &TaskShared, error: anyhow::Error) -> TaskFailure {
        let trace = TaskTrace {
            task: shared.id,
            name: shared.name.clone(),
            resumes: shared.resumes.get(),
            kernel: self.core.name.clone(),
        };

        TaskFailure::new(error, trace)
    }

    /// Steps the kernel until `budget` has elapsed on its clock or there is
    /// nothing left to do.
    ///
    /// With `early_out`, also returns as soon as the ready queue is empty
    /// after a step: everything left is stalled and cannot make progress
    /// before its condition changes. A zero budget does nothing.
    ///
    /// Returns the number of steps taken.
    ///
    /// # Errors
    ///
    /// Same as [`step`](Self::step); the first error stops the run.
    pub fn run_for(&self, budget: Duration, early_out: bool) -> Result<usize, KernelError> {
        let start = self.core.clock.now();
        let mut steps = 0;

        while self.core.clock.now().saturating_sub(start) < budget {
            if !self.step()? {
                break;
            }

            steps += 1;

            if early_out && self.ready_len() == 0 {
                break;
            }
        }

        tracing::trace!(kernel = %self.core.name, steps, "run finished");

        Ok(steps)
    }

    /// Adds `future` as a task and steps the kernel until it resolves.
    ///
    /// Other queued tasks run alongside it in the usual order. Whatever the
    /// outcome, the task added for `future` is no longer queued once this
    /// returns.
    ///
    /// # Errors
    ///
    /// - [`KernelError::Unhandled`] if `future` raised, or if another task
    ///   raised without a handler first.
    /// - [`KernelError::Cancelled`] if the task was removed.
    /// - [`KernelError::Deadlock`] if the kernel ran out of work first.
    /// - [`KernelError::Misuse`] if called from inside one of this kernel's
    ///   own tasks.
    pub fn block_on<Fut, T, E>(&self, future: Fut) -> Result<T, KernelError>
    where
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<anyhow::Error> + 'static,
        T: 'static,
    {
        if self.core.running.get().is_some() {
            return Err(MisuseError::ReentrantStep.into());
        }

        let slot: Rc<RefCell<Option<Result<T, TaskFailure>>>> = Rc::default();

        let done = slot.clone();
        let failed = slot.clone();

        let handle = self
            .task(future)
            .name("block_on")
            .on_complete(move |value| *done.borrow_mut() = Some(Ok(value)))
            .on_error(move |failure| *failed.borrow_mut() = Some(Err(failure)))
            .add();

        loop {
            if let Some(result) = slot.borrow_mut().take() {
                return result.map_err(KernelError::Unhandled);
            }

            if handle.state() == TaskState::Cancelled {
                return Err(KernelError::Cancelled(handle.id()));
            }

            let stepped = match self.step() {
                Ok(stepped) => stepped,
                Err(err) => {
                    // Nobody reads the slot once we return.
                    self.remove(&handle);
                    return Err(err);
                }
            };

            if !stepped {
                self.remove(&handle);
                return Err(KernelError::Deadlock);
            }
        }
    }

    /// Number of queued tasks (ready and stalled).
    pub fn len(&self) -> usize {
        let queues = self.core.queues.borrow();
        queues.ready_len() + queues.stalled_len()
    }

    /// Returns `true` if no task is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tasks in the ready queue.
    pub fn ready_len(&self) -> usize {
        self.core.queues.borrow().ready_len()
    }

    /// Number of tasks in the stalled queue.
    pub fn stalled_len(&self) -> usize {
        self.core.queues.borrow().stalled_len()
    }

    /// Number of times the stalled queue became the ready queue.
    pub fn pivots(&self) -> u64 {
        self.core.pivots()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.core.queues.borrow();

        f.debug_struct("Kernel")
            .field("name", &self.core.name)
            .field("ready", &queues.ready_len())
            .field("stalled", &queues.stalled_len())
            .field("running", &self.core.running.get())
            .finish()
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
