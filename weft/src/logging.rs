//! Log output for hosts embedding the kernel.
//!
//! The kernel reports through `tracing` and never installs a subscriber on
//! its own. Hosts that have no subscriber of their own can call [`init`]:
//!
//! ```rust
//! weft::logging::init();
//! tracing::info!("Hello, {}", "world");
//! ```
//!
//! Every task resume runs inside a `task` span carrying the kernel name, the
//! task id and the task name, so events emitted from a task body are
//! attributed to that task.

use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a compact `[LEVEL] message` formatter at `INFO` level.
///
/// `RUST_LOG` overrides the level when set.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Installs a compact `[LEVEL] message` formatter at `level`.
///
/// `RUST_LOG` overrides the level when set. Calling this more than once,
/// or after another subscriber was installed, does nothing.
pub fn init_with_level(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(true)
        .compact()
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(layer).try_init();
}
