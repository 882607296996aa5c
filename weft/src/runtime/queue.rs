use crate::runtime::task::{Task, TaskId};

use std::collections::VecDeque;
use std::mem;

/// The kernel's two run queues.
///
/// `ready` holds tasks due for their next turn, `stalled` holds tasks that
/// suspended on a condition. Together they hold every queued task exactly
/// once.
///
/// When `ready` runs dry the two deques trade places instead of moving
/// elements over, so a stalled task gets its next turn only after every task
/// that was ready when it stalled has had one.
pub(crate) struct RunQueues {
    /// Tasks due for immediate resumption, front first.
    ready: VecDeque<Task>,

    /// Tasks waiting for the current round to finish.
    stalled: VecDeque<Task>,

    /// Number of times `ready` and `stalled` were swapped.
    pivots: u64,
}

impl RunQueues {
    /// Creates two empty queues.
    pub(crate) fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            stalled: VecDeque::new(),
            pivots: 0,
        }
    }

    /// Appends a task to the back of the ready queue.
    pub(crate) fn push_ready(&mut self, task: Task) {
        self.ready.push_back(task);
    }

    /// Appends a task to the back of the stalled queue.
    pub(crate) fn push_stalled(&mut self, task: Task) {
        self.stalled.push_back(task);
    }

    /// Pops the next task to resume.
    ///
    /// If `ready` is empty but `stalled` is not, the queues are swapped first.
    /// Returns `None` only when both are empty.
    pub(crate) fn pop(&mut self) -> Option<Task> {
        if self.ready.is_empty() {
            if self.stalled.is_empty() {
                return None;
            }

            mem::swap(&mut self.ready, &mut self.stalled);
            self.pivots += 1;

            tracing::trace!(ready = self.ready.len(), "pivoted stalled queue");
        }

        self.ready.pop_front()
    }

    /// Unlinks the task with the given id, searching `ready` then `stalled`.
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<Task> {
        if let Some(index) = self.ready.iter().position(|task| task.id() == id) {
            return self.ready.remove(index);
        }

        let index = self.stalled.iter().position(|task| task.id() == id)?;
        self.stalled.remove(index)
    }

    /// Number of tasks in the ready queue.
    pub(crate) fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of tasks in the stalled queue.
    pub(crate) fn stalled_len(&self) -> usize {
        self.stalled.len()
    }

    /// Number of times the queues were swapped.
    pub(crate) fn pivots(&self) -> u64 {
        self.pivots
    }

    /// Takes every queued task out, leaving both queues empty.
    pub(crate) fn drain(&mut self) -> Vec<Task> {
        self.ready.drain(..).chain(self.stalled.drain(..)).collect()
    }
}
