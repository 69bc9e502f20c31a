//! Shell launcher backed by `tokio::process`.

use super::r#trait::{Launcher, Process, ProcessExit};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// How commands are handed to the shell.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Shell program
    pub program: String,
    /// Flag that makes the shell read the command from the next argument
    pub flag: String,
    /// Working directory for every command (None = inherit)
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// How long to wait for the first output line once the shell has exited
    pub line_grace: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        let (program, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        Self {
            program: program.to_string(),
            flag: flag.to_string(),
            cwd: None,
            env: Vec::new(),
            line_grace: Duration::from_millis(200),
        }
    }
}

impl ShellConfig {
    /// Create the platform default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different shell program and command flag.
    pub fn with_shell(mut self, program: impl Into<String>, flag: impl Into<String>) -> Self {
        self.program = program.into();
        self.flag = flag.into();
        self
    }

    /// Run every command from `dir`.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set how long an exited command may still take to deliver its first line.
    pub fn with_line_grace(mut self, grace: Duration) -> Self {
        self.line_grace = grace;
        self
    }
}

/// Launches each command as `<shell> <flag> <command>` with stdout piped.
#[derive(Debug, Clone, Default)]
pub struct ShellLauncher {
    config: ShellConfig,
}

impl ShellLauncher {
    /// Create a launcher with the platform default shell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a launcher from an explicit configuration.
    pub fn with_config(config: ShellConfig) -> Self {
        Self { config }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg(&self.config.flag).arg(command);

        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.config.env {
            cmd.env(k, v);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        // A run that fails fatally drops its watchers; take the shells down with them.
        cmd.kill_on_drop(true);
        cmd
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str) -> std::io::Result<Box<dyn Process>> {
        let mut child = self.command(command).spawn()?;
        trace!(pid = ?child.id(), %command, "spawned");

        let first_line = child.stdout.take().map(spawn_capture);
        Ok(Box::new(ShellProcess {
            child,
            first_line,
            line_grace: self.config.line_grace,
        }))
    }
}

/// A child spawned by [`ShellLauncher`].
///
/// Its stdout is read by a separate task from launch on. The exit counts as
/// observed when the shell itself exits, even if a background job it started
/// still holds the pipe open.
pub struct ShellProcess {
    child: Child,
    first_line: Option<oneshot::Receiver<std::io::Result<String>>>,
    line_grace: Duration,
}

#[async_trait]
impl Process for ShellProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn finish(&mut self) -> std::io::Result<ProcessExit> {
        let status = self.child.wait().await?;

        let first_line = match self.first_line.take() {
            None => String::new(),
            Some(line) => match tokio::time::timeout(self.line_grace, line).await {
                Ok(Ok(line)) => line?,
                Ok(Err(_)) => String::new(),
                Err(_) => {
                    debug!(grace = ?self.line_grace, "No complete output line after exit");
                    String::new()
                }
            },
        };

        Ok(ProcessExit {
            first_line,
            exit_code: status.code(),
        })
    }
}

/// Read the first line in the background, then keep draining so the writer
/// never blocks on a full pipe.
fn spawn_capture(stdout: ChildStdout) -> oneshot::Receiver<std::io::Result<String>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let line = read_first_line(&mut reader).await;
        let drain = line.is_ok();
        let _ = tx.send(line);
        if drain {
            let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
        }
    });
    rx
}

/// Read one line from `reader`.
///
/// The line terminator (`\n` or `\r\n`) is stripped. Invalid UTF-8 is replaced
/// rather than rejected. Whatever follows the line is left in `reader`.
pub async fn read_first_line<R>(reader: &mut BufReader<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf).await?;

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
