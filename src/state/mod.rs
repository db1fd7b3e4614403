//! State module for tracking run progress
//!
//! Each domain task walks a small state machine from `Pending` to one of the
//! terminal states `Skipped`, `Failed` or `Merged`. The coordinator counts the
//! terminal states into the run summary.

mod task_state;

pub use task_state::TaskState;
