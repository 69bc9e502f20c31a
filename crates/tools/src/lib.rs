//! Process launching
//!
//! Start external commands without blocking and capture what they print.

#![warn(missing_docs)]

pub mod r#trait;
pub mod shell;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use r#trait::{Launcher, Process, ProcessExit};
pub use shell::{read_first_line, ShellConfig, ShellLauncher, ShellProcess};
