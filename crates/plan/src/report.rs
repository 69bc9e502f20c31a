//! Read-count summary built from scheduler results.

use crate::run_info::RunSummary;
use crate::tasks::CountJob;
use regex::Regex;
use seqpost_core::ResultStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn lane_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_L00(\d)_").expect("lane pattern is valid"))
}

fn read_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"R[0-9]_001\.fastq\.gz").expect("read file pattern is valid"))
}

/// Lane number in an Illumina file name (`S1_L002_R1_001.fastq.gz` → 2).
pub fn lane_of(file: &str) -> Option<u8> {
    lane_pattern()
        .captures(file)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether `file` holds sequencing reads rather than index reads.
pub fn is_read_file(file: &str) -> bool {
    read_file_pattern().is_match(file)
}

/// Reads counted in one data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadCount {
    /// Project name
    pub project: String,
    /// Lane taken from the file name
    pub lane: Option<u8>,
    /// Sample name
    pub sample: String,
    /// File name
    pub file: String,
    /// Number of reads (None when the count did not produce a number)
    pub reads: Option<u64>,
}

/// Reads of one project, index files excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTotal {
    /// Project name
    pub project: String,
    /// Archive handed to the user
    pub archive: String,
    /// Sum over the project's `R<n>_001.fastq.gz` files
    pub reads: u64,
}

/// Summary written next to the run output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Sequencer, read length and footer notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunSummary>,
    /// Per-file read counts, in plan order
    pub counts: Vec<ReadCount>,
    /// Per-project totals, sorted by project
    pub totals: Vec<ProjectTotal>,
    /// Raw result of every scheduled command
    pub commands: ResultStore,
}

impl RunReport {
    /// Build the report for `counts` from `results`.
    pub fn new(counts: &[CountJob], results: ResultStore) -> Self {
        let counts: Vec<ReadCount> = counts
            .iter()
            .map(|job| ReadCount {
                project: job.project.clone(),
                lane: lane_of(&job.file),
                sample: job.sample.clone(),
                file: job.file.clone(),
                reads: results.output(&job.command).and_then(|o| o.trim().parse().ok()),
            })
            .collect();

        let mut by_project: BTreeMap<&str, u64> = BTreeMap::new();
        for count in &counts {
            let total = by_project.entry(count.project.as_str()).or_default();
            if is_read_file(&count.file) {
                *total += count.reads.unwrap_or(0);
            }
        }
        let totals = by_project
            .into_iter()
            .map(|(project, reads)| ProjectTotal {
                project: project.to_string(),
                archive: format!("{project}.tar.gz"),
                reads,
            })
            .collect();

        Self {
            run: None,
            counts,
            totals,
            commands: results,
        }
    }

    /// Attach the run metadata.
    pub fn with_run(mut self, run: RunSummary) -> Self {
        self.run = Some(run);
        self
    }

    /// Total reads over every project.
    pub fn total_reads(&self) -> u64 {
        self.totals.iter().map(|t| t.reads).sum()
    }
}
