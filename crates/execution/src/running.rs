//! The set of tasks whose processes are alive.

use seqpost_core::{Task, Time};
use std::collections::BTreeMap;
use std::fmt;

/// Admission sequence number of a running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u64);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A task that has been launched and not yet collected.
#[derive(Debug, Clone)]
pub struct RunningEntry {
    /// The task
    pub task: Task,
    /// When it was launched
    pub started_at: Time,
    /// OS process id, if known
    pub pid: Option<u32>,
}

/// Running tasks in admission order.
///
/// The total weight is maintained next to the entries, so it always equals the
/// sum over the entries present.
#[derive(Debug, Default)]
pub struct RunningSet {
    entries: BTreeMap<Slot, RunningEntry>,
    weight: u64,
    next_slot: u64,
}

impl RunningSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a launched task and return its slot.
    pub fn insert(&mut self, task: Task, started_at: Time, pid: Option<u32>) -> Slot {
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        self.weight += u64::from(task.weight);
        self.entries.insert(slot, RunningEntry { task, started_at, pid });
        slot
    }

    /// Remove a task whose exit has been observed.
    pub fn remove(&mut self, slot: Slot) -> Option<RunningEntry> {
        let entry = self.entries.remove(&slot)?;
        self.weight -= u64::from(entry.task.weight);
        Some(entry)
    }

    /// Sum of the weights of all running tasks.
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Number of running tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is running.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The longest-running task.
    pub fn oldest(&self) -> Option<(Slot, &RunningEntry)> {
        self.entries.iter().next().map(|(s, e)| (*s, e))
    }

    /// Iterate in admission order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &RunningEntry)> {
        self.entries.iter().map(|(s, e)| (*s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Time {
        chrono::Utc::now()
    }

    #[test]
    fn test_weight_follows_entries() {
        let mut running = RunningSet::new();
        assert!(running.is_empty());

        let a = running.insert(Task::new("a", 3), now(), Some(10));
        let b = running.insert(Task::new("b", 2), now(), None);
        assert_eq!(running.len(), 2);
        assert_eq!(running.weight(), 5);

        let removed = running.remove(a).unwrap();
        assert_eq!(removed.task.command, "a");
        assert_eq!(removed.pid, Some(10));
        assert_eq!(running.weight(), 2);

        running.remove(b).unwrap();
        assert_eq!(running.weight(), 0);
        assert!(running.is_empty());
    }

    #[test]
    fn test_remove_twice_is_none() {
        let mut running = RunningSet::new();
        let slot = running.insert(Task::new("a", 1), now(), None);

        assert!(running.remove(slot).is_some());
        assert!(running.remove(slot).is_none());
        assert_eq!(running.weight(), 0);
    }

    #[test]
    fn test_admission_order_is_kept() {
        let mut running = RunningSet::new();
        let a = running.insert(Task::new("a", 1), now(), None);
        let b = running.insert(Task::new("b", 1), now(), None);
        let c = running.insert(Task::new("c", 1), now(), None);

        running.remove(b);

        let order: Vec<_> = running.iter().map(|(_, e)| e.task.command.as_str()).collect();
        assert_eq!(order, vec!["a", "c"]);
        assert_eq!(running.oldest().map(|(s, _)| s), Some(a));

        running.remove(a);
        assert_eq!(running.oldest().map(|(s, _)| s), Some(c));
    }

    #[test]
    fn test_duplicate_commands_get_distinct_slots() {
        let mut running = RunningSet::new();
        let first = running.insert(Task::new("same", 1), now(), None);
        let second = running.insert(Task::new("same", 1), now(), None);

        assert_ne!(first, second);
        assert_eq!(running.len(), 2);
        assert_eq!(first.to_string(), "#0");
        assert_eq!(second.to_string(), "#1");
    }
}
