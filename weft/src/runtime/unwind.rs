use crate::runtime::context;

use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

static HOOK: Once = Once::new();

thread_local! {
    /// Backtrace recorded by the panic hook for the last panic raised inside
    /// a task on this thread.
    static PANIC_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

/// Installs the process-wide panic hook, once.
///
/// The hook records a backtrace while the panicking frames are still on the
/// stack, then hands over to whatever hook was installed before it. Panics
/// outside of a task are passed through untouched.
pub(crate) fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();

        panic::set_hook(Box::new(move |info| {
            if context::in_task() {
                let backtrace = Backtrace::capture();
                let captured = (backtrace.status() == BacktraceStatus::Captured).then_some(backtrace);

                let _ = PANIC_BACKTRACE.try_with(|slot| *slot.borrow_mut() = captured);
            }

            previous(info);
        }));
    });
}

/// Takes the backtrace recorded for the panic that was just caught.
///
/// Returns `None` when capture is disabled (`RUST_BACKTRACE` unset) or not
/// supported on this target.
pub(crate) fn take_backtrace() -> Option<Backtrace> {
    PANIC_BACKTRACE
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}
