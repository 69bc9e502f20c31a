//! Task model - the unit of scheduling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of capacity units a task holds while it runs.
pub type Weight = u32;

/// A shell command together with the capacity it consumes.
///
/// The command string is opaque to the scheduler. It is handed to the shell
/// unchanged and doubles as the key under which the task's output is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    /// Command line passed to the shell
    pub command: String,

    /// Capacity units held while running
    pub weight: Weight,
}

impl Task {
    /// Create a new task.
    pub fn new(command: impl Into<String>, weight: Weight) -> Self {
        Self {
            command: command.into(),
            weight,
        }
    }

    /// Identity under which the result of this task is recorded.
    pub fn identity(&self) -> &str {
        &self.command
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.weight, self.command)
    }
}

/// Lifecycle of a task inside one scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting in the input list
    Queued,
    /// Process launched, exit not yet observed
    Running,
    /// Exit observed and output recorded
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Queued => write!(f, "queued"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
        }
    }
}
