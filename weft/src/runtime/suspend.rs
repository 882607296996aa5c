use crate::error::MisuseError;
use crate::runtime::context;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the kernel exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    /// Polls the yield future.
    ///
    /// On the first poll the task goes back to the ready queue by
    /// returning `Poll::Pending`. On the second poll the future completes.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.0 {
            self.0 = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}

/// Yields execution back to the kernel.
///
/// The task is appended to the back of the ready queue, so every task
/// ahead of it gets a turn first. Unlike [`stall`], the task stays in the
/// current round.
///
/// # Examples
///
/// ```rust,ignore
/// async fn task() -> anyhow::Result<()> {
///     // Allow other tasks to run
///     yield_now().await;
///     Ok(())
/// }
/// ```
pub async fn yield_now() {
    YieldOnce(false).await
}

/// A future that stalls the running task exactly once.
///
/// Created by [`stall`].
#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct Stall {
    stalled: bool,
}

impl Future for Stall {
    type Output = ();

    /// On the first poll the stall request is recorded in the task frame and
    /// the task is filed into the stalled queue. The second poll completes.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.stalled {
            return Poll::Ready(());
        }

        self.stalled = true;
        context::request_stall();
        cx.waker().wake_by_ref();

        Poll::Pending
    }
}

/// Suspends the running task until the rest of the current round has run.
///
/// The task is moved to the stalled queue and resumed only after every task
/// that is ready right now has had its turn. Use it to wait on a condition
/// (a clock, another task) without being re-polled on every pass.
///
/// # Errors
///
/// Returns [`MisuseError::StallOutsideTask`] when called outside of a task.
///
/// # Examples
///
/// ```rust,ignore
/// async fn poll_flag(flag: Rc<Cell<bool>>) -> anyhow::Result<()> {
///     while !flag.get() {
///         stall()?.await;
///     }
///     Ok(())
/// }
/// ```
pub fn stall() -> Result<Stall, MisuseError> {
    if !context::in_task() {
        return Err(MisuseError::StallOutsideTask);
    }

    Ok(Stall { stalled: false })
}
