//! Scripted launcher for exercising schedulers without real processes.
//!
//! Every command must be scripted up front. A script fixes the output line,
//! exit code, run time and the weight the fake accounts for while the
//! "process" is alive. The launcher keeps a shared log of start and finish
//! events plus the highest concurrently running weight it has seen.

use super::r#trait::{Launcher, Process, ProcessExit};
use async_trait::async_trait;
use seqpost_core::Weight;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Behaviour of one fake process.
#[derive(Debug, Clone)]
pub struct Script {
    output: String,
    exit_code: Option<i32>,
    delay: Duration,
    weight: Weight,
}

impl Script {
    /// A process that prints `output`, exits 0 immediately and weighs 1.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(0),
            delay: Duration::ZERO,
            weight: 1,
        }
    }

    /// Run for `delay` before exiting.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Exit with `code` (None = killed by a signal).
    pub fn exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Weight counted towards the running total while alive.
    pub fn weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }
}

/// Something the fake observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    /// A process for this command was launched
    Started(String),
    /// A process for this command exited
    Finished(String),
}

/// Snapshot of what the fake has seen so far.
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    /// Start and finish events in the order they happened
    pub events: Vec<FakeEvent>,
    /// Weight of processes alive right now
    pub running_weight: Weight,
    /// Highest `running_weight` ever reached
    pub peak_weight: Weight,
}

impl FakeLog {
    /// Position of an event in the log.
    pub fn position(&self, event: &FakeEvent) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    /// Commands in launch order.
    pub fn started(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FakeEvent::Started(c) => Some(c.as_str()),
                FakeEvent::Finished(_) => None,
            })
            .collect()
    }

    /// Commands in exit order.
    pub fn finished(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FakeEvent::Finished(c) => Some(c.as_str()),
                FakeEvent::Started(_) => None,
            })
            .collect()
    }
}

/// In-memory [`Launcher`] driven by [`Script`]s.
///
/// Scripting the same command several times queues the scripts; each launch
/// consumes the next one and the last one is reused once the queue runs dry.
/// Launching an unscripted command fails with `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Script>>>>,
    log: Arc<Mutex<FakeLog>>,
}

impl FakeLauncher {
    /// Create a launcher with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next launch of `command`.
    pub fn script(self, command: impl Into<String>, script: Script) -> Self {
        self.scripts
            .lock()
            .expect("fake scripts poisoned")
            .entry(command.into())
            .or_default()
            .push_back(script);
        self
    }

    /// Copy of the log.
    pub fn log(&self) -> FakeLog {
        self.log.lock().expect("fake log poisoned").clone()
    }

    fn next_script(&self, command: &str) -> Option<Script> {
        let mut scripts = self.scripts.lock().expect("fake scripts poisoned");
        let queue = scripts.get_mut(command)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, command: &str) -> std::io::Result<Box<dyn Process>> {
        let script = self.next_script(command).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no script for command: {command}"),
            )
        })?;

        let mut log = self.log.lock().expect("fake log poisoned");
        log.events.push(FakeEvent::Started(command.to_string()));
        log.running_weight += script.weight;
        log.peak_weight = log.peak_weight.max(log.running_weight);

        Ok(Box::new(FakeProcess {
            command: command.to_string(),
            script,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeProcess {
    command: String,
    script: Script,
    log: Arc<Mutex<FakeLog>>,
}

#[async_trait]
impl Process for FakeProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn finish(&mut self) -> std::io::Result<ProcessExit> {
        tokio::time::sleep(self.script.delay).await;

        let mut log = self.log.lock().expect("fake log poisoned");
        log.events.push(FakeEvent::Finished(self.command.clone()));
        log.running_weight -= self.script.weight;

        Ok(ProcessExit {
            first_line: self.script.output.clone(),
            exit_code: self.script.exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fake_launcher_tracks_weight() {
        let launcher = FakeLauncher::new()
            .script("a", Script::new("A").weight(3).delay(Duration::from_millis(10)))
            .script("b", Script::new("B").weight(2));

        let mut a = launcher.launch("a").unwrap();
        let mut b = launcher.launch("b").unwrap();
        assert_eq!(launcher.log().running_weight, 5);

        assert_eq!(b.finish().await.unwrap().first_line, "B");
        assert_eq!(a.finish().await.unwrap().first_line, "A");

        let log = launcher.log();
        assert_eq!(log.running_weight, 0);
        assert_eq!(log.peak_weight, 5);
        assert_eq!(log.started(), vec!["a", "b"]);
        assert_eq!(log.finished(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_fake_launcher_queues_scripts() {
        let launcher = FakeLauncher::new()
            .script("same", Script::new("first"))
            .script("same", Script::new("second"));

        let first = launcher.launch("same").unwrap().finish().await.unwrap();
        let second = launcher.launch("same").unwrap().finish().await.unwrap();
        let third = launcher.launch("same").unwrap().finish().await.unwrap();

        assert_eq!(first.first_line, "first");
        assert_eq!(second.first_line, "second");
        assert_eq!(third.first_line, "second");
    }

    #[test]
    fn test_fake_launcher_rejects_unscripted() {
        let launcher = FakeLauncher::new();
        let err = launcher.launch("missing").err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(launcher.log().events.is_empty());
    }
}
