//! Task state: one source/destination pair, the settings snapshot captured
//! at enqueue time, and the lifecycle status owned by the queue.

use crate::settings::Snapshot;
use std::path::PathBuf;

/// Lifecycle of a queued task. Transitions are owned by the queue; nothing
/// else mutates a task's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for a worker slot.
    Pending,
    /// A worker is executing the task's ffmpeg pipeline.
    Running,
    /// Dispatch was suspended while the task was still pending.
    Paused,
    /// Finished successfully; output exists.
    Completed,
    /// Finished unsuccessfully; `detail` carries the diagnosis.
    Failed,
    /// Stopped by the user before completion.
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses never transition again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the queue may move a task from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Paused | Self::Cancelled),
            Self::Paused => matches!(next, Self::Pending | Self::Cancelled),
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }
}

/// One unit of work: process `source` into `dest` using the immutable
/// settings captured in `snapshot`.
#[derive(Debug, Clone)]
pub struct Task {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub snapshot: Snapshot,
    pub status: TaskStatus,
    /// Completion percentage (0-100), None while indeterminate.
    pub progress: Option<f32>,
    /// Human-readable failure or status detail.
    pub detail: Option<String>,
}

impl Task {
    #[must_use]
    pub fn new(source: PathBuf, dest: PathBuf, snapshot: Snapshot) -> Self {
        Self {
            source,
            dest,
            snapshot,
            status: TaskStatus::Pending,
            progress: None,
            detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_never_transition() {
        for terminal in [
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            for next in [
                TaskStatus::Pending,
                TaskStatus::Running,
                TaskStatus::Paused,
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_pending_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Paused));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn test_running_only_reaches_terminal_states() {
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Paused));
    }
}
