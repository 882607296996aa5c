use super::core::Kernel;
use crate::time::{Clock, SystemClock};

use std::rc::Rc;

/// Builder for configuring and creating a kernel.
///
/// `KernelBuilder` allows customizing kernel parameters before
/// constructing it. Currently, it supports the kernel's name, used to label
/// logs and failure traces, and its clock.
///
/// # Examples
///
/// ```rust
/// use weft::KernelBuilder;
/// use weft::time::ManualClock;
///
/// let clock = ManualClock::new();
/// let kernel = KernelBuilder::new()
///     .name("ai")
///     .clock(clock.clone())
///     .build();
///
/// assert_eq!(kernel.name(), "ai");
/// ```
pub struct KernelBuilder {
    /// Label of the kernel.
    name: String,

    /// Time source used by `run_for` and `wait`.
    clock: Rc<dyn Clock>,
}

impl KernelBuilder {
    /// Creates a new `KernelBuilder` with default configuration.
    ///
    /// By default the kernel is named `"kernel"` and reads time from a
    /// [`SystemClock`].
    pub fn new() -> Self {
        Self {
            name: String::from("kernel"),
            clock: Rc::new(SystemClock::new()),
        }
    }

    /// Sets the name of the kernel.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "kernel name must not be empty");

        self.name = name;
        self
    }

    /// Sets the time source of the kernel.
    ///
    /// Hosts with their own notion of time (a fixed-step simulation, a
    /// replay) pass a [`ManualClock`](crate::time::ManualClock) here and
    /// advance it every tick.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    /// Builds the kernel with the configured options.
    pub fn build(self) -> Kernel {
        Kernel::with_parts(self.name, self.clock)
    }
}

impl Default for KernelBuilder {
    /// Creates a default `KernelBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
