use super::handle::{JoinHandle, Slot, TaskHandle};
use crate::error::{KernelError, MisuseError, TaskFailure};
use crate::runtime::core::Kernel;
use crate::runtime::suspend::stall;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

/// Spawns a future as a sibling task on the kernel running the caller.
///
/// The new task is appended to the back of the ready queue, so it first runs
/// after every task already queued. Its value (or failure) is delivered
/// through the returned [`JoinHandle`]; a failing sibling never escalates to
/// the host on its own.
///
/// # Errors
///
/// Returns [`MisuseError::SpawnOutsideTask`] when called outside of a task.
pub fn spawn<Fut, T, E>(future: Fut) -> Result<JoinHandle<T>, MisuseError>
where
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    let kernel = Kernel::current().ok_or(MisuseError::SpawnOutsideTask)?;
    let slot: Slot<Result<T, TaskFailure>> = Rc::default();

    let done = slot.clone();
    let failed = slot.clone();

    let task = kernel
        .task(future)
        .on_complete(move |value| *done.borrow_mut() = Some(Ok(value)))
        .on_error(move |failure| *failed.borrow_mut() = Some(Err(failure)))
        .add();

    Ok(JoinHandle { task, slot })
}

/// Aborts every task it holds when dropped.
///
/// Tasks that already finished are left alone. Fan-in helpers use it so
/// that siblings do not keep running once nobody is waiting for them.
#[derive(Debug, Default)]
pub struct AbortGuard {
    handles: Vec<TaskHandle>,
}

impl AbortGuard {
    /// Creates a guard over `handles`.
    pub fn new(handles: Vec<TaskHandle>) -> Self {
        Self { handles }
    }

    /// Returns the number of guarded tasks.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if the guard holds no task.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Aborts every guarded task that has not finished yet.
    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Shared state of one `await_*` call.
///
/// Every sibling writes its value into its own slot of `results` and
/// decrements `pending`; the first failure wins `failure`.
struct FanIn<T> {
    results: RefCell<Vec<Option<T>>>,
    pending: Cell<usize>,
    failure: RefCell<Option<TaskFailure>>,
}

impl<T> FanIn<T> {
    fn new(count: usize) -> Self {
        Self {
            results: RefCell::new((0..count).map(|_| None).collect()),
            pending: Cell::new(count),
            failure: RefCell::new(None),
        }
    }

    fn finish(&self, index: usize, value: T) {
        self.results.borrow_mut()[index] = Some(value);
        self.pending.set(self.pending.get() - 1);
    }

    fn fail(&self, failure: TaskFailure) {
        let mut slot = self.failure.borrow_mut();

        if slot.is_none() {
            *slot = Some(failure);
        }
    }

    fn collect(&self) -> Vec<T> {
        self.results.borrow_mut().drain(..).flatten().collect()
    }
}

/// Launches one sibling of a fan-in as its own task.
fn launch<F, A, Fut, T, E>(
    kernel: &Kernel,
    fan_in: &Rc<FanIn<T>>,
    index: usize,
    body: F,
    args: A,
) -> TaskHandle
where
    F: FnOnce(A) -> Fut + 'static,
    A: 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    let done = fan_in.clone();
    let failed = fan_in.clone();

    kernel
        .call_task(body, args)
        .name(format!("await[{index}]"))
        .on_complete(move |value| done.finish(index, value))
        .on_error(move |failure| failed.fail(failure))
        .add()
}

/// Stalls until every sibling finished or one of them failed.
async fn gather<T>(fan_in: Rc<FanIn<T>>, mut guard: AbortGuard) -> Result<Vec<T>, KernelError> {
    loop {
        if let Some(failure) = fan_in.failure.borrow_mut().take() {
            tracing::debug!(
                task = %failure.trace.task,
                siblings = guard.len(),
                "await failed fast"
            );
            guard.abort_all();
            return Err(KernelError::Unhandled(failure));
        }

        if fan_in.pending.get() == 0 {
            return Ok(fan_in.collect());
        }

        stall()?.await;
    }
}

/// Runs every future as its own task and waits for all of them.
///
/// The values come back in the order of `futures`, whatever order the tasks
/// finished in. The calling task stalls until the last one is done.
///
/// Fails fast: the first sibling failure is returned as
/// [`KernelError::Unhandled`] and the siblings still pending are removed.
/// Dropping the returned future also removes them.
///
/// # Errors
///
/// Returns [`KernelError::Misuse`] when called outside of a task.
///
/// # Examples
///
/// ```rust,ignore
/// let values = await_all(vec![fetch(1), fetch(2), fetch(3)]).await?;
/// assert_eq!(values.len(), 3);
/// ```
pub async fn await_all<I, Fut, T, E>(futures: I) -> Result<Vec<T>, KernelError>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    let (fan_in, guard) = {
        let kernel = Kernel::current().ok_or(MisuseError::SpawnOutsideTask)?;
        let futures: Vec<Fut> = futures.into_iter().collect();
        let fan_in = Rc::new(FanIn::new(futures.len()));

        let handles = futures
            .into_iter()
            .enumerate()
            .map(|(index, future)| launch(&kernel, &fan_in, index, move |()| future, ()))
            .collect();

        (fan_in, AbortGuard::new(handles))
    };

    gather(fan_in, guard).await
}

/// Calls every function with a clone of `args`, each in its own task, and
/// waits for all of them.
///
/// Each function runs lazily on its task's first resume. Ordering and
/// failure behave as in [`await_all`].
pub async fn await_each<I, F, A, Fut, T, E>(fns: I, args: A) -> Result<Vec<T>, KernelError>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(A) -> Fut + 'static,
    A: Clone + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    let (fan_in, guard) = {
        let kernel = Kernel::current().ok_or(MisuseError::SpawnOutsideTask)?;
        let fns: Vec<F> = fns.into_iter().collect();
        let fan_in = Rc::new(FanIn::new(fns.len()));

        let handles = fns
            .into_iter()
            .enumerate()
            .map(|(index, body)| launch(&kernel, &fan_in, index, body, args.clone()))
            .collect();

        (fan_in, AbortGuard::new(handles))
    };

    gather(fan_in, guard).await
}

/// Runs one future as its own task and waits for its value.
///
/// The single-future form of [`await_all`]; the value comes back unwrapped.
pub async fn await_one<Fut, T, E>(future: Fut) -> Result<T, KernelError>
where
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    let mut values = await_all([future]).await?;

    values.pop().ok_or(KernelError::Deadlock)
}

/// Calls `body(args)` in its own task and waits for its value.
///
/// The single-function form of [`await_each`]; `args` is moved into the
/// task instead of cloned and the value comes back unwrapped.
pub async fn await_call<F, A, Fut, T, E>(body: F, args: A) -> Result<T, KernelError>
where
    F: FnOnce(A) -> Fut + 'static,
    A: 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
    T: 'static,
{
    let (fan_in, guard) = {
        let kernel = Kernel::current().ok_or(MisuseError::SpawnOutsideTask)?;
        let fan_in = Rc::new(FanIn::new(1));
        let handle = launch(&kernel, &fan_in, 0, body, args);

        (fan_in, AbortGuard::new(vec![handle]))
    };

    let mut values = gather(fan_in, guard).await?;

    values.pop().ok_or(KernelError::Deadlock)
}
