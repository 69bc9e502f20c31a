//! Discovery of projects, samples and data files in a run directory.
//!
//! A run directory looks like:
//!
//! ```text
//! <root>/
//!   Project_A/
//!     Sample_1/  r1.fastq.gz  r2.fastq.gz
//!     Sample_2/  ...
//!   Project_B/
//!     ...
//! ```
//!
//! Everything is collected into sorted maps so the task order built from a
//! layout is stable between runs.

use crate::error::{PlanError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default pattern for project directory names.
pub const DEFAULT_PROJECT_PATTERN: &str = "^Project";

/// Which projects to pick up from the run directory.
#[derive(Debug, Clone)]
pub enum ProjectSelector {
    /// Every directory whose name matches the pattern
    Matching(Regex),
    /// Exactly one directory, which must exist
    Named(String),
}

impl ProjectSelector {
    /// Every directory whose name starts with `Project`.
    pub fn all() -> Self {
        Self::Matching(Regex::new(DEFAULT_PROJECT_PATTERN).expect("default pattern is valid"))
    }

    /// Every directory whose name matches `pattern`.
    pub fn matching(pattern: &str) -> Result<Self> {
        Ok(Self::Matching(Regex::new(pattern)?))
    }

    /// A single project by name. `ALL` (any case) selects every project.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case("all") {
            Self::all()
        } else {
            Self::Named(name)
        }
    }
}

impl Default for ProjectSelector {
    fn default() -> Self {
        Self::all()
    }
}

/// One project: sample name → data file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Samples in this project
    pub samples: BTreeMap<String, Vec<String>>,
}

impl Project {
    /// Number of data files across all samples.
    pub fn file_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }
}

/// A data file located inside a run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile<'a> {
    /// Project name
    pub project: &'a str,
    /// Sample name
    pub sample: &'a str,
    /// File name
    pub file: &'a str,
}

/// Projects found under a run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLayout {
    /// Directory that was scanned
    pub root: PathBuf,
    /// Project name → project
    pub projects: BTreeMap<String, Project>,
}

impl RunLayout {
    /// Path of a data file on disk.
    pub fn path_of(&self, file: &DataFile<'_>) -> PathBuf {
        self.root.join(file.project).join(file.sample).join(file.file)
    }

    /// Every data file, ordered by project, sample and file name.
    pub fn files(&self) -> impl Iterator<Item = DataFile<'_>> {
        self.projects.iter().flat_map(|(project, p)| {
            p.samples.iter().flat_map(move |(sample, files)| {
                files.iter().map(move |file| DataFile {
                    project: project.as_str(),
                    sample: sample.as_str(),
                    file: file.as_str(),
                })
            })
        })
    }

    /// Number of data files across all projects.
    pub fn file_count(&self) -> usize {
        self.projects.values().map(Project::file_count).sum()
    }
}

/// Scan `root` for projects, their samples and their data files.
pub async fn discover(root: impl AsRef<Path>, selector: &ProjectSelector) -> Result<RunLayout> {
    let root = root.as_ref().to_path_buf();
    if !fs::metadata(&root).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(PlanError::InputDir(root));
    }
    debug!("Top directory is {}", root.display());

    let names = match selector {
        ProjectSelector::Matching(pattern) => list_entries(&root, EntryKind::Dir)
            .await?
            .into_iter()
            .filter(|name| pattern.is_match(name))
            .collect(),
        ProjectSelector::Named(name) => {
            if !fs::metadata(root.join(name)).await.map(|m| m.is_dir()).unwrap_or(false) {
                return Err(PlanError::ProjectNotFound {
                    project: name.clone(),
                    root,
                });
            }
            vec![name.clone()]
        }
    };

    let mut projects = BTreeMap::new();
    for name in names {
        let project_dir = root.join(&name);
        debug!("Searching {}", project_dir.display());

        let mut project = Project::default();
        for sample in list_entries(&project_dir, EntryKind::Dir).await? {
            let files = list_entries(&project_dir.join(&sample), EntryKind::File).await?;
            for file in &files {
                debug!("{}\t{}\t{}", name, sample, file);
            }
            project.samples.insert(sample, files);
        }
        projects.insert(name, project);
    }

    Ok(RunLayout { root, projects })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

/// Sorted names of the directories or regular files directly inside `dir`.
async fn list_entries(dir: &Path, kind: EntryKind) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        // Follow symlinks so linked sample folders and files count.
        let meta = fs::metadata(entry.path()).await?;
        let wanted = match kind {
            EntryKind::Dir => meta.is_dir(),
            EntryKind::File => meta.is_file(),
        };
        if wanted {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}
