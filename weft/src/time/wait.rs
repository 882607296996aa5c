use super::clock::Clock;
use crate::error::MisuseError;
use crate::runtime::context;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Creates a future that completes once `duration` has elapsed on the
/// kernel's clock.
///
/// The deadline is taken when `wait` is called. Until it is reached the
/// task does nothing but stall, so it is resumed at most once per kernel
/// round and never makes any other progress in between.
///
/// # Errors
///
/// Returns [`MisuseError::WaitOutsideTask`] when called outside of a task:
/// there would be no kernel to resume it.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// wait(Duration::from_millis(10))?.await;
/// ```
pub fn wait(duration: Duration) -> Result<Wait, MisuseError> {
    let kernel = context::current_kernel().ok_or(MisuseError::WaitOutsideTask)?;
    let clock = kernel.clock();
    let deadline = clock.now().saturating_add(duration);

    Ok(Wait { clock, deadline })
}

/// A future that completes once a deadline is reached on a kernel clock.
///
/// Created by [`wait`]. Dropping it simply abandons the wait.
#[must_use = "futures do nothing unless awaited"]
pub struct Wait {
    /// Clock of the kernel that created the wait.
    clock: Rc<dyn Clock>,

    /// Clock reading at which the wait completes.
    deadline: Duration,
}

impl Wait {
    /// Returns the time left before the wait completes.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_sub(self.clock.now())
    }
}

impl Future for Wait {
    /// The wait future produces no value.
    type Output = ();

    /// Polls the wait future.
    ///
    /// Completes once the clock reaches the deadline; otherwise the task
    /// stalls until the next round.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.clock.now() >= self.deadline {
            return Poll::Ready(());
        }

        context::request_stall();
        cx.waker().wake_by_ref();

        Poll::Pending
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("deadline", &self.deadline)
            .field("remaining", &self.remaining())
            .finish()
    }
}
