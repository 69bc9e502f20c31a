//! Process launching abstraction.

use async_trait::async_trait;

/// Starts commands as independent processes.
///
/// `launch` must not wait for the process to finish; the returned handle is
/// awaited separately.
pub trait Launcher: Send + Sync {
    /// Start `command` and return a handle to the running process.
    fn launch(&self, command: &str) -> std::io::Result<Box<dyn Process>>;
}

/// A launched process whose exit has not been observed yet.
#[async_trait]
pub trait Process: Send {
    /// OS process id, if the process has one.
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit and capture its output.
    ///
    /// Must only be called once.
    async fn finish(&mut self) -> std::io::Result<ProcessExit>;
}

/// Observed exit of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// First line of stdout, without its line terminator
    pub first_line: String,

    /// Exit code (None when terminated by a signal)
    pub exit_code: Option<i32>,
}

impl ProcessExit {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
