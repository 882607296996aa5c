use super::handle::{TaskHandle, TaskId, TaskShared};
use crate::error::TaskFailure;
use crate::runtime::core::Kernel;

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// What a single resume of a task asks the kernel to do next.
pub(crate) enum Signal {
    /// Pending without a stall request: back of the ready queue.
    Continue,

    /// Pending with a stall request: back of the stalled queue.
    Stall,

    /// The body finished; its value is parked in the computation.
    Complete,

    /// The body raised.
    Fail(TaskFailure),
}

/// A resumable computation with its completion callbacks attached.
///
/// The trait erases the body's output type so the kernel can keep every
/// task in the same queue.
pub(crate) trait Resumable {
    /// Resumes the computation once.
    ///
    /// `Ready(Ok(()))` means the body finished and its value is held until
    /// [`complete`](Self::complete) is called.
    fn resume(&mut self, cx: &mut Context<'_>) -> Poll<anyhow::Result<()>>;

    /// Hands the finished value to `on_complete`, if one was given.
    fn complete(&mut self);

    /// Hands a failure to `on_error`, or gives it back if there is none.
    fn recover(&mut self, failure: TaskFailure) -> Result<(), TaskFailure>;
}

type CompleteFn<T> = Box<dyn FnOnce(T)>;
type ErrorFn = Box<dyn FnOnce(TaskFailure)>;

enum Stage<F, A, Fut> {
    /// Not resumed yet; the body is built from `F(A)` on the first resume.
    Start(F, A),
    Running(Pin<Box<Fut>>),
    Finished,
}

/// A task body together with its invocation arguments and callbacks.
pub(crate) struct Computation<F, A, Fut, T> {
    stage: Stage<F, A, Fut>,
    output: Option<T>,
    on_complete: Option<CompleteFn<T>>,
    on_error: Option<ErrorFn>,
}

impl<F, A, Fut, T, E> Resumable for Computation<F, A, Fut, T>
where
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    fn resume(&mut self, cx: &mut Context<'_>) -> Poll<anyhow::Result<()>> {
        if let Stage::Start(..) = self.stage {
            if let Stage::Start(body, args) = mem::replace(&mut self.stage, Stage::Finished) {
                self.stage = Stage::Running(Box::pin(body(args)));
            }
        }

        let Stage::Running(future) = &mut self.stage else {
            return Poll::Ready(Err(anyhow::anyhow!("task resumed after it finished")));
        };

        let result = match future.as_mut().poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };

        // Drop the body as soon as it is done with.
        self.stage = Stage::Finished;

        match result {
            Ok(value) => {
                self.output = Some(value);
                Poll::Ready(Ok(()))
            }
            Err(error) => Poll::Ready(Err(error.into())),
        }
    }

    fn complete(&mut self) {
        if let (Some(on_complete), Some(value)) = (self.on_complete.take(), self.output.take()) {
            on_complete(value);
        }
    }

    fn recover(&mut self, failure: TaskFailure) -> Result<(), TaskFailure> {
        match self.on_error.take() {
            Some(on_error) => {
                on_error(failure);
                Ok(())
            }
            None => Err(failure),
        }
    }
}

/// A task owned by a kernel queue.
///
/// Exactly one `Task` owns a computation; dropping the task drops it.
pub(crate) struct Task {
    pub(crate) shared: Rc<TaskShared>,
    pub(crate) body: Box<dyn Resumable>,
}

impl Task {
    pub(crate) fn new(shared: Rc<TaskShared>, body: Box<dyn Resumable>) -> Self {
        Self { shared, body }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.shared.id
    }
}

/// Configures a task before adding it to a kernel.
///
/// Created by [`Kernel::task`] or [`Kernel::call_task`]. Nothing is queued
/// until [`add`](Self::add) is called.
///
/// # Examples
///
/// ```rust
/// use weft::Kernel;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let kernel = Kernel::new();
/// let seen = Rc::new(Cell::new(0));
///
/// let sink = seen.clone();
/// kernel
///     .task(async { Ok::<_, anyhow::Error>(7) })
///     .name("seven")
///     .on_complete(move |v| sink.set(v))
///     .add();
///
/// kernel.step().unwrap();
/// assert_eq!(seen.get(), 7);
/// ```
#[must_use = "a task is only queued once `add` is called"]
pub struct TaskBuilder<'k, F, A, T> {
    kernel: &'k Kernel,
    body: F,
    args: A,
    name: Option<String>,
    on_complete: Option<CompleteFn<T>>,
    on_error: Option<ErrorFn>,
}

impl<'k, F, A, Fut, T, E> TaskBuilder<'k, F, A, T>
where
    F: FnOnce(A) -> Fut + 'static,
    A: 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    pub(crate) fn new(kernel: &'k Kernel, body: F, args: A) -> Self {
        Self {
            kernel,
            body,
            args,
            name: None,
            on_complete: None,
            on_error: None,
        }
    }

    /// Labels the task in logs and failure traces.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Called once with the body's value if the task finishes and was not
    /// cancelled.
    pub fn on_complete(mut self, on_complete: impl FnOnce(T) + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    /// Called once with the failure if the body raises.
    ///
    /// Without it a failure is escalated out of [`Kernel::step`].
    pub fn on_error(mut self, on_error: impl FnOnce(TaskFailure) + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Appends the task to the back of the kernel's ready queue.
    pub fn add(self) -> TaskHandle {
        let computation = Computation {
            stage: Stage::Start(self.body, self.args),
            output: None,
            on_complete: self.on_complete,
            on_error: self.on_error,
        };

        self.kernel.insert(self.name, Box::new(computation))
    }
}
