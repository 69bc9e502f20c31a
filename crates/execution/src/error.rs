//! Scheduler errors.

use thiserror::Error;

/// Result type for scheduling runs.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors that end a scheduling run.
///
/// A command that fails, or cannot be started at all, is not an error here.
/// Its exit code or launch error is recorded with its result.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task declared a weight of zero
    #[error("task `{command}` has zero weight")]
    ZeroWeight { command: String },

    /// The exit of a running process could not be observed
    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },

    /// An exit watcher stopped without reporting
    #[error("exit watcher lost: {0}")]
    WatcherLost(String),
}
