//! Execution layer - capacity-bounded scheduling of external commands.

#![warn(missing_docs)]

pub mod scheduler;
pub mod running;
pub mod engine;
mod error;

pub use scheduler::{Admission, AdmissionController, Budget};
pub use running::{RunningEntry, RunningSet, Slot};
pub use engine::{CommandScheduler, SchedulerConfig};
pub use error::{Result, SchedulerError};
