//! seqpost core data models.
//!
//! This crate defines the values exchanged between the command scheduler,
//! the process launchers and the planning layer that builds task lists.

#![warn(missing_docs)]

// Identities
mod id;

// Scheduling input
mod task;

// Scheduling output
mod result;

// Re-exports
pub use id::RunId;
pub use task::{Task, TaskState, Weight};
pub use result::{CommandResult, ResultStore};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
