use super::wait::wait;
use crate::error::MisuseError;
use crate::runtime::core::Kernel;
use crate::runtime::task::TaskHandle;

use std::time::Duration;

async fn fire_once<F>(callback: F, delay: Duration) -> Result<(), MisuseError>
where
    F: FnOnce(),
{
    wait(delay)?.await;
    callback();

    Ok(())
}

async fn fire_every<F>(mut callback: F, delay: Duration) -> Result<(), MisuseError>
where
    F: FnMut(),
{
    loop {
        wait(delay)?.await;
        callback();
    }
}

impl Kernel {
    /// Schedules `callback` to run once, `delay` from the task's first turn.
    ///
    /// The returned handle can be passed to [`remove`](Kernel::remove) to
    /// cancel the timer before it fires.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use weft::Kernel;
    ///
    /// let kernel = Kernel::new();
    /// let timer = kernel.add_timeout(|| println!("tick"), Duration::from_secs(5));
    ///
    /// assert!(kernel.remove(&timer));
    /// ```
    pub fn add_timeout<F>(&self, callback: F, delay: Duration) -> TaskHandle
    where
        F: FnOnce() + 'static,
    {
        self.call_task(|(callback, delay)| fire_once(callback, delay), (callback, delay))
            .name("timeout")
            .add()
    }

    /// Schedules `callback` to run every `delay`, forever.
    ///
    /// Each period starts after the previous call returned. The only way to
    /// stop it is [`remove`](Kernel::remove) (or [`TaskHandle::abort`]) with
    /// the returned handle, or dropping the whole kernel.
    pub fn add_interval<F>(&self, callback: F, delay: Duration) -> TaskHandle
    where
        F: FnMut() + 'static,
    {
        self.call_task(|(callback, delay)| fire_every(callback, delay), (callback, delay))
            .name("interval")
            .add()
    }
}
