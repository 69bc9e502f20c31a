//! Results collected from finished commands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Time;

/// What a finished command left behind.
///
/// Only the first line of standard output is kept. Callers that need the whole
/// stream must redirect it to a file inside the command itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// First line of stdout, without its line terminator
    pub output: String,

    /// Exit code (None when terminated by a signal)
    pub exit_code: Option<i32>,

    /// When the process was launched
    pub started_at: Time,

    /// When the exit was observed
    pub finished_at: Time,

    /// Why the process could not be started, if it never ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
}

impl CommandResult {
    /// Result of a command whose process never started.
    pub fn not_launched(error: impl Into<String>, at: Time) -> Self {
        Self {
            output: String::new(),
            exit_code: None,
            started_at: at,
            finished_at: at,
            launch_error: Some(error.into()),
        }
    }

    /// Whether the command ran and exited with status zero.
    pub fn success(&self) -> bool {
        self.launch_error.is_none() && self.exit_code == Some(0)
    }
}

/// Command identity → result of its most recent completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultStore {
    entries: HashMap<String, CommandResult>,
}

impl ResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result. A previous result under the same identity is replaced
    /// and returned.
    pub fn record(&mut self, identity: impl Into<String>, result: CommandResult) -> Option<CommandResult> {
        self.entries.insert(identity.into(), result)
    }

    /// Move every result of `other` into this store, replacing on collision.
    pub fn merge(&mut self, other: ResultStore) {
        self.entries.extend(other.entries);
    }

    /// Get the full result for an identity.
    pub fn get(&self, identity: &str) -> Option<&CommandResult> {
        self.entries.get(identity)
    }

    /// Get only the captured output line for an identity.
    pub fn output(&self, identity: &str) -> Option<&str> {
        self.entries.get(identity).map(|r| r.output.as_str())
    }

    /// Number of distinct identities recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (identity, result) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandResult)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Results whose process did not exit with status zero.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &CommandResult)> {
        self.iter().filter(|(_, r)| !r.success())
    }

    /// Collapse to the plain identity → output mapping.
    pub fn into_outputs(self) -> HashMap<String, String> {
        self.entries
            .into_iter()
            .map(|(k, v)| (k, v.output))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(output: &str, exit_code: Option<i32>) -> CommandResult {
        let now = chrono::Utc::now();
        CommandResult {
            output: output.to_string(),
            exit_code,
            started_at: now,
            finished_at: now,
            launch_error: None,
        }
    }

    #[test]
    fn test_record_and_lookup() {
        let mut store = ResultStore::new();
        assert!(store.is_empty());

        assert!(store.record("echo A", result("A", Some(0))).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.output("echo A"), Some("A"));
        assert!(store.get("echo A").unwrap().success());
        assert!(store.output("echo B").is_none());
    }

    #[test]
    fn test_launch_failure_is_a_failure() {
        let mut store = ResultStore::new();
        store.record("missing", CommandResult::not_launched("No such file or directory", chrono::Utc::now()));
        store.record("ok", result("fine", Some(0)));

        let failed: Vec<_> = store.failures().map(|(id, _)| id).collect();
        assert_eq!(failed, vec!["missing"]);
        assert_eq!(store.output("missing"), Some(""));
        assert_eq!(store.get("missing").unwrap().exit_code, None);
    }

    #[test]
    fn test_launch_error_is_omitted_from_json_when_absent() {
        let json = serde_json::to_value(result("A", Some(0))).unwrap();
        assert!(json.get("launch_error").is_none());

        let back: CommandResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.launch_error, None);
    }

    #[test]
    fn test_merge_replaces_on_collision() {
        let mut store = ResultStore::new();
        store.record("a", result("1", Some(0)));
        store.record("b", result("2", Some(0)));

        let mut later = ResultStore::new();
        later.record("b", result("3", Some(1)));
        later.record("c", result("4", Some(0)));

        store.merge(later);
        assert_eq!(store.len(), 3);
        assert_eq!(store.output("b"), Some("3"));
        assert_eq!(store.output("c"), Some("4"));
    }

    #[test]
    fn test_later_record_overwrites() {
        let mut store = ResultStore::new();
        store.record("cmd", result("first", Some(0)));

        let previous = store.record("cmd", result("second", Some(0)));
        assert_eq!(previous.unwrap().output, "first");
        assert_eq!(store.len(), 1);
        assert_eq!(store.output("cmd"), Some("second"));
    }

    #[test]
    fn test_failures_include_signals_and_non_zero() {
        let mut store = ResultStore::new();
        store.record("ok", result("", Some(0)));
        store.record("bad", result("", Some(2)));
        store.record("killed", result("", None));

        let mut failed: Vec<_> = store.failures().map(|(k, _)| k).collect();
        failed.sort();
        assert_eq!(failed, vec!["bad", "killed"]);
    }

    #[test]
    fn test_into_outputs() {
        let mut store = ResultStore::new();
        store.record("echo A", result("A", Some(0)));
        store.record("echo B", result("B", Some(0)));

        let outputs = store.into_outputs();
        assert_eq!(outputs.get("echo A").map(String::as_str), Some("A"));
        assert_eq!(outputs.get("echo B").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_store_serializes_as_map() {
        let mut store = ResultStore::new();
        store.record("echo A", result("A", Some(0)));

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["echo A"]["output"], "A");
        assert_eq!(json["echo A"]["exit_code"], 0);
    }
}
