//! The command scheduler - admits, launches, watches and collects.

use crate::error::{Result, SchedulerError};
use crate::running::{RunningSet, Slot};
use crate::scheduler::{Admission, AdmissionController, Budget};
use seqpost_core::{CommandResult, ResultStore, RunId, Task, TaskState};
use seqpost_tools::{Launcher, ProcessExit};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Configuration for the command scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Capacity budget
    pub budget: Budget,
}

impl SchedulerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total capacity.
    pub fn with_capacity(mut self, capacity: seqpost_core::Weight) -> Self {
        self.budget = self.budget.with_capacity(capacity);
        self
    }
}

/// Exit report sent by a watcher when its process ends.
struct Exit {
    slot: Slot,
    outcome: std::io::Result<ProcessExit>,
}

/// Runs weighted commands under a shared capacity budget.
///
/// ```text
/// queue ──admit──▶ running ──exit──▶ results
///   ▲                 │
///   └──── wait ◀──────┘  (head does not fit)
/// ```
///
/// Tasks start strictly in input order. When the head of the queue does not
/// fit, nothing starts until enough weight has exited. A task heavier than the
/// whole capacity starts once nothing else is running.
///
/// Each launched process gets a watcher that awaits its exit and reports back,
/// so the control loop sleeps until an exit actually happens instead of
/// polling. There is no timeout: a process that never exits holds its weight
/// forever and the run never returns.
pub struct CommandScheduler {
    launcher: Arc<dyn Launcher>,
    config: SchedulerConfig,
}

impl CommandScheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self {
            launcher,
            config: SchedulerConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every task to completion and return their results.
    ///
    /// The store holds one entry per distinct command, including commands whose
    /// process could not be started. When several tasks share a command, the
    /// one whose exit was observed last wins.
    pub async fn run(&self, tasks: Vec<Task>) -> Result<ResultStore> {
        if let Some(task) = tasks.iter().find(|t| t.weight == 0) {
            return Err(SchedulerError::ZeroWeight {
                command: task.command.clone(),
            });
        }

        let run_id = RunId::new();
        let span = info_span!("schedule", run = %run_id, capacity = self.config.budget.capacity);
        self.run_queue(tasks.into()).instrument(span).await
    }

    async fn run_queue(&self, mut queue: VecDeque<Task>) -> Result<ResultStore> {
        info!("Scheduling {} tasks", queue.len());

        let admission = AdmissionController::new(self.config.budget);
        let mut running = RunningSet::new();
        let mut watchers: JoinSet<Exit> = JoinSet::new();
        let mut results = ResultStore::new();

        while let Some(next) = queue.front() {
            match admission.decide(&running, next.weight) {
                Admission::Wait => {
                    debug!(
                        next = %next.command,
                        weight = next.weight,
                        used = running.weight(),
                        oldest = ?running.oldest().map(|(slot, _)| slot),
                        "Capacity full, waiting for an exit"
                    );
                    self.collect_exits(&mut watchers, &mut running, &mut results).await?;
                }
                decision => {
                    let Some(task) = queue.pop_front() else { break };
                    if decision == Admission::AdmitAlone {
                        warn!(
                            command = %task.command,
                            weight = task.weight,
                            "Task exceeds capacity, running it alone"
                        );
                    }
                    self.launch(task, &mut watchers, &mut running, &mut results);
                }
            }
        }

        if !running.is_empty() {
            debug!("Queue empty, draining {} running tasks", running.len());
        }
        while !running.is_empty() {
            self.collect_exits(&mut watchers, &mut running, &mut results).await?;
        }

        info!("Completed run with {} results", results.len());
        Ok(results)
    }

    /// Start `task`. A task that cannot be started is recorded as failed right away.
    fn launch(
        &self,
        task: Task,
        watchers: &mut JoinSet<Exit>,
        running: &mut RunningSet,
        results: &mut ResultStore,
    ) {
        let started_at = chrono::Utc::now();
        let mut process = match self.launcher.launch(&task.command) {
            Ok(process) => process,
            Err(source) => {
                error!(command = %task.command, error = %source, "Launch failed");
                results.record(task.identity(), CommandResult::not_launched(source.to_string(), started_at));
                return;
            }
        };

        let pid = process.id();
        let weight = task.weight;
        let slot = running.insert(task, started_at, pid);
        debug!(%slot, ?pid, weight, used = running.weight(), state = %TaskState::Running, "Launched");

        watchers.spawn(async move {
            let outcome = process.finish().await;
            Exit { slot, outcome }
        });
    }

    /// Wait for at least one exit, then take any others already reported.
    async fn collect_exits(
        &self,
        watchers: &mut JoinSet<Exit>,
        running: &mut RunningSet,
        results: &mut ResultStore,
    ) -> Result<()> {
        let joined = watchers.join_next().await.ok_or_else(|| {
            SchedulerError::WatcherLost(format!("{} tasks running without a watcher", running.len()))
        })?;
        self.collect(joined, running, results)?;

        while let Some(joined) = watchers.try_join_next() {
            self.collect(joined, running, results)?;
        }

        Ok(())
    }

    fn collect(
        &self,
        joined: std::result::Result<Exit, JoinError>,
        running: &mut RunningSet,
        results: &mut ResultStore,
    ) -> Result<()> {
        let exit = joined.map_err(|e| SchedulerError::WatcherLost(e.to_string()))?;
        let entry = running.remove(exit.slot).ok_or_else(|| {
            SchedulerError::WatcherLost(format!("exit reported for unknown slot {}", exit.slot))
        })?;

        let finished = exit.outcome.map_err(|source| SchedulerError::Wait {
            command: entry.task.command.clone(),
            source,
        })?;

        debug!(
            slot = %exit.slot,
            command = %entry.task.command,
            exit_code = ?finished.exit_code,
            success = finished.success(),
            used = running.weight(),
            state = %TaskState::Completed,
            "Exited"
        );

        let result = CommandResult {
            output: finished.first_line,
            exit_code: finished.exit_code,
            started_at: entry.started_at,
            finished_at: chrono::Utc::now(),
            launch_error: None,
        };

        if results.record(entry.task.identity(), result).is_some() {
            debug!(slot = %exit.slot, "Replaced earlier result for the same command");
        }

        Ok(())
    }
}
