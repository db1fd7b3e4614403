/// Task state definitions for tracking one domain through a run
///
/// ```text
/// Pending ──► Skipped
///    │
///    └──► Fetching ──► Failed
///             │
///             └──► Analyzing ──► Capturing ──► Merged
/// ```
use std::fmt;

/// Represents the current state of a domain task in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is waiting for the staleness check
    Pending,

    /// Page is being fetched
    Fetching,

    /// Fetched content is being analyzed
    Analyzing,

    /// Thumbnail is being captured
    Capturing,

    // ===== Terminal States =====
    /// A fresh snapshot exists; nothing was fetched
    Skipped,

    /// Fetch failed; the prior snapshot (if any) is untouched
    Failed,

    /// A new snapshot was merged into the store
    Merged,
}

impl TaskState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Failed | Self::Merged)
    }

    /// Returns true if this task is still in progress
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether moving from `self` to `next` follows the task lifecycle
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Skipped)
                | (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetching, Self::Analyzing)
                | (Self::Analyzing, Self::Capturing)
                | (Self::Capturing, Self::Merged)
        )
    }

    /// Moves to `next`, returning the rejected pair when the transition is not allowed
    pub fn transition(&mut self, next: TaskState) -> Result<(), (TaskState, TaskState)> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err((*self, next))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Analyzing => "analyzing",
            Self::Capturing => "capturing",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Merged => "merged",
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
