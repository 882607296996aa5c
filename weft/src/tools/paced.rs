use crate::error::MisuseError;
use crate::task::{stall, yield_now};

/// Wraps `f` so that a tight loop calling it spreads over several kernel
/// turns.
///
/// Before every `every_n`-th call the wrapper pauses: it stalls if
/// `should_stall` is set, otherwise it yields. An `every_n` of zero is
/// treated as one.
///
/// # Examples
///
/// ```rust,ignore
/// let mut expand = wrap_iterator(|node| graph.expand(node), false, 64);
///
/// while let Some(node) = open.pop() {
///     for next in expand.call(node).await? {
///         open.push(next);
///     }
/// }
/// ```
pub fn wrap_iterator<F>(f: F, should_stall: bool, every_n: usize) -> Paced<F> {
    Paced {
        f,
        should_stall,
        every_n: every_n.max(1),
        calls: 0,
    }
}

/// A function that hands control back to the kernel every few calls.
///
/// Created by [`wrap_iterator`].
#[derive(Debug, Clone)]
pub struct Paced<F> {
    /// The wrapped function.
    f: F,

    /// Stall instead of yielding when pausing.
    should_stall: bool,

    /// Pause before every `every_n`-th call.
    every_n: usize,

    /// Calls made so far.
    calls: usize,
}

impl<F> Paced<F> {
    /// Calls the wrapped function, pausing first if this call is due.
    ///
    /// # Errors
    ///
    /// Returns [`MisuseError::StallOutsideTask`] if the wrapper is set to
    /// stall and the call happens outside of a task.
    pub async fn call<A, R>(&mut self, arg: A) -> Result<R, MisuseError>
    where
        F: FnMut(A) -> R,
    {
        self.calls += 1;

        if self.calls % self.every_n == 0 {
            if self.should_stall {
                stall()?.await;
            } else {
                yield_now().await;
            }
        }

        Ok((self.f)(arg))
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the wrapped function.
    pub fn into_inner(self) -> F {
        self.f
    }
}
