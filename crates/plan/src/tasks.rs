//! Task list construction for a sequencing run.
//!
//! Three kinds of scheduled work are produced, in this order:
//!
//! 1. one `tar | pigz` archive per project (weighted by pigz threads)
//! 2. one read count per data file
//! 3. one `falco` QC run per data file
//!
//! Falco output is bundled per project afterwards, once every QC run is done.

use crate::layout::{DataFile, RunLayout};
use crate::quote::{quote_path, shell_quote};
use seqpost_core::{Task, Weight};
use std::path::{Path, PathBuf};

/// What to include in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Skip the per-project archives
    pub skip_archive: bool,
    /// Skip falco QC
    pub skip_qc: bool,
    /// pigz threads per archive, also the archive task weight
    pub archive_threads: Weight,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            skip_archive: false,
            skip_qc: false,
            archive_threads: 10,
        }
    }
}

impl PlanOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the per-project archives.
    pub fn without_archive(mut self) -> Self {
        self.skip_archive = true;
        self
    }

    /// Skip falco QC.
    pub fn without_qc(mut self) -> Self {
        self.skip_qc = true;
        self
    }

    /// Set pigz threads per archive.
    pub fn with_archive_threads(mut self, threads: Weight) -> Self {
        self.archive_threads = threads.max(1);
        self
    }
}

/// A scheduled read count and the file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountJob {
    /// Project name
    pub project: String,
    /// Sample name
    pub sample: String,
    /// File name
    pub file: String,
    /// Command whose output is the read count
    pub command: String,
}

/// Everything needed to process one run.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Tasks for the scheduler, in submission order
    pub tasks: Vec<Task>,
    /// Read count tasks with their file
    pub counts: Vec<CountJob>,
    /// Directories falco writes into; must exist before scheduling
    pub qc_dirs: Vec<PathBuf>,
    /// Per-project falco bundles, run after `tasks`
    pub bundles: Vec<Task>,
}

/// Build the task list for `layout`, writing results under `output`.
pub fn plan(layout: &RunLayout, output: &Path, options: &PlanOptions) -> Plan {
    let mut plan = Plan::default();

    if !options.skip_archive {
        for project in layout.projects.keys() {
            plan.tasks.push(archive_task(&layout.root, project, output, options.archive_threads));
        }
    }

    for file in layout.files() {
        let task = count_task(&layout.path_of(&file));
        plan.counts.push(CountJob {
            project: file.project.to_string(),
            sample: file.sample.to_string(),
            file: file.file.to_string(),
            command: task.command.clone(),
        });
        plan.tasks.push(task);
    }

    if !options.skip_qc {
        for (project, p) in &layout.projects {
            for sample in p.samples.keys() {
                plan.qc_dirs.push(qc_dir(output, project, sample));
            }
        }
        for file in layout.files() {
            plan.tasks.push(falco_task(layout, &file, output));
        }
        for project in layout.projects.keys() {
            plan.bundles.push(falco_bundle_task(output, project));
        }
    }

    plan
}

/// Archive one project directory as `<output>/<project>.tar.gz`.
pub fn archive_task(input: &Path, project: &str, output: &Path, threads: Weight) -> Task {
    let archive = output.join(format!("{project}.tar.gz"));
    Task::new(
        format!(
            "cd {} && tar -cf - ./{} | pigz -p{} -c > {}",
            quote_path(input),
            shell_quote(project),
            threads,
            quote_path(&archive),
        ),
        threads,
    )
}

/// Count the records in a gzipped fastq file.
pub fn count_task(file: &Path) -> Task {
    Task::new(format!("unpigz -p1 -c {} | grep -c '@'", quote_path(file)), 1)
}

/// Directory receiving falco output for one sample.
pub fn qc_dir(output: &Path, project: &str, sample: &str) -> PathBuf {
    output.join("falco").join(project).join(sample)
}

/// Run falco on one data file.
pub fn falco_task(layout: &RunLayout, file: &DataFile<'_>, output: &Path) -> Task {
    let dir = qc_dir(output, file.project, file.sample);
    let out = |suffix: &str| quote_path(&dir.join(format!("{}{}", file.file, suffix)));
    Task::new(
        format!(
            "falco -q -D {} -R {} -S {} {}",
            out("data.txt"),
            out("report.html"),
            out("summary.txt"),
            quote_path(&layout.path_of(file)),
        ),
        1,
    )
}

/// Bundle a project's falco output as `<output>/<project>_falco.tar.gz`.
pub fn falco_bundle_task(output: &Path, project: &str) -> Task {
    Task::new(
        format!(
            "cd {} && tar -czf {} {}",
            quote_path(output),
            shell_quote(&format!("{project}_falco.tar.gz")),
            shell_quote(&format!("falco/{project}")),
        ),
        1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Project;
    use std::collections::BTreeMap;

    fn layout() -> RunLayout {
        let mut a = Project::default();
        a.samples.insert("S1".into(), vec!["r1.fastq.gz".into(), "r2.fastq.gz".into()]);
        let mut b = Project::default();
        b.samples.insert("S2".into(), vec!["x.fastq.gz".into()]);

        let mut projects = BTreeMap::new();
        projects.insert("Project_A".to_string(), a);
        projects.insert("Project_B".to_string(), b);
        RunLayout {
            root: PathBuf::from("/runs/r1"),
            projects,
        }
    }

    #[test]
    fn test_archive_task() {
        let task = archive_task(Path::new("/runs/r1"), "Project_A", Path::new("/out"), 10);
        assert_eq!(
            task.command,
            "cd /runs/r1 && tar -cf - ./Project_A | pigz -p10 -c > /out/Project_A.tar.gz"
        );
        assert_eq!(task.weight, 10);
    }

    #[test]
    fn test_count_task() {
        let task = count_task(Path::new("/runs/r1/Project_A/S1/r1.fastq.gz"));
        assert_eq!(task.command, "unpigz -p1 -c /runs/r1/Project_A/S1/r1.fastq.gz | grep -c '@'");
        assert_eq!(task.weight, 1);
    }

    #[test]
    fn test_count_task_quotes_paths() {
        let task = count_task(Path::new("/runs/my run/a.fastq.gz"));
        assert_eq!(task.command, "unpigz -p1 -c '/runs/my run/a.fastq.gz' | grep -c '@'");
    }

    #[test]
    fn test_falco_task() {
        let layout = layout();
        let file = layout.files().next().unwrap();
        let task = falco_task(&layout, &file, Path::new("/out"));
        assert_eq!(
            task.command,
            "falco -q -D /out/falco/Project_A/S1/r1.fastq.gzdata.txt \
             -R /out/falco/Project_A/S1/r1.fastq.gzreport.html \
             -S /out/falco/Project_A/S1/r1.fastq.gzsummary.txt \
             /runs/r1/Project_A/S1/r1.fastq.gz"
        );
    }

    #[test]
    fn test_falco_bundle_task() {
        let task = falco_bundle_task(Path::new("/out"), "Project_A");
        assert_eq!(task.command, "cd /out && tar -czf Project_A_falco.tar.gz falco/Project_A");
    }

    #[test]
    fn test_full_plan_order() {
        let plan = plan(&layout(), Path::new("/out"), &PlanOptions::new().with_archive_threads(4));

        // 2 archives, 3 counts, 3 falco runs
        assert_eq!(plan.tasks.len(), 8);
        assert!(plan.tasks[0].command.contains("tar -cf - ./Project_A"));
        assert!(plan.tasks[1].command.contains("tar -cf - ./Project_B"));
        assert_eq!(plan.tasks[0].weight, 4);
        assert!(plan.tasks[2..5].iter().all(|t| t.command.starts_with("unpigz")));
        assert!(plan.tasks[5..].iter().all(|t| t.command.starts_with("falco")));

        assert_eq!(plan.counts.len(), 3);
        assert_eq!(plan.counts[2].project, "Project_B");
        assert_eq!(plan.counts[2].file, "x.fastq.gz");
        assert_eq!(plan.counts[0].command, plan.tasks[2].command);

        assert_eq!(
            plan.qc_dirs,
            vec![PathBuf::from("/out/falco/Project_A/S1"), PathBuf::from("/out/falco/Project_B/S2")]
        );
        assert_eq!(plan.bundles.len(), 2);
    }

    #[test]
    fn test_plan_skips() {
        let plan = plan(&layout(), Path::new("/out"), &PlanOptions::new().without_archive().without_qc());

        assert_eq!(plan.tasks.len(), 3);
        assert!(plan.tasks.iter().all(|t| t.command.starts_with("unpigz")));
        assert!(plan.qc_dirs.is_empty());
        assert!(plan.bundles.is_empty());
    }

    #[test]
    fn test_archive_threads_at_least_one() {
        assert_eq!(PlanOptions::new().with_archive_threads(0).archive_threads, 1);
    }
}
