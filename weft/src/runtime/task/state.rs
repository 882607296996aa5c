use std::fmt;

/// Lifecycle state of a task.
///
/// ```text
/// Ready ──► Running ──► Ready | Stalled | Completed | Failed | Cancelled
///   ▲                     │       │
///   └─────────────────────┴───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued for its next turn in the ready queue.
    Ready,

    /// Currently being resumed by [`Kernel::step`](crate::Kernel::step).
    ///
    /// At most one task per kernel observes this state at a time.
    Running,

    /// Suspended on a condition; resumed only after every task that was
    /// ready when it stalled has had a turn.
    ///
    /// Once the kernel pivots its queues the task is back in the ready
    /// queue and its handle reports [`Ready`](Self::Ready) again.
    Stalled,

    /// The body finished. It will not be resumed again.
    Completed,

    /// The body raised. It will not be resumed again.
    Failed,

    /// Removed before it could finish.
    Cancelled,
}

impl TaskState {
    /// Returns `true` for states a task never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Stalled => "stalled",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };

        f.write_str(label)
    }
}
