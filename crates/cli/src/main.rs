//! seqpost CLI - post-processing for sequencing runs on a weighted scheduler.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seqpost_core::{ResultStore, Task, Weight};
use seqpost_execution::{CommandScheduler, SchedulerConfig};
use seqpost_plan::{PlanOptions, ProjectSelector, RunReport, SequencerNames, QC_TOOL, REQUIRED_TOOLS};
use seqpost_tools::ShellLauncher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "seqpost")]
#[command(about = "Archive, count and QC a sequencing run in parallel", long_about = None)]
struct Cli {
    /// Log scheduler decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a run directory
    Prepare {
        /// Run directory holding the project directories
        #[arg(short, long)]
        inputdir: PathBuf,
        /// Output directory, must not exist yet
        #[arg(short, long)]
        outputdir: PathBuf,
        /// Project to process, or ALL for every Project* directory
        #[arg(short, long, default_value = "ALL")]
        project: String,
        /// Total weight allowed to run at once
        #[arg(long, default_value = "20")]
        threads: Weight,
        /// pigz threads per project archive
        #[arg(long, default_value = "10")]
        archive_threads: Weight,
        /// Do not archive projects
        #[arg(long)]
        skip_tar: bool,
        /// Do not run falco
        #[arg(long)]
        skip_qc: bool,
        /// Sample sheet copied into the output directory
        #[arg(short, long)]
        samplesheet: Option<PathBuf>,
        /// JSON map of instrument serial to sequencer name
        #[arg(long, env = seqpost_plan::SEQUENCERS_ENV)]
        sequencers: Option<PathBuf>,
    },
    /// Schedule ad-hoc commands given as WEIGHT=COMMAND
    Run {
        /// Total weight allowed to run at once
        #[arg(long, default_value = "20")]
        capacity: Weight,
        /// Tasks, e.g. "2=sleep 1 && echo done"
        #[arg(required = true)]
        tasks: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Commands::Prepare {
            inputdir,
            outputdir,
            project,
            threads,
            archive_threads,
            skip_tar,
            skip_qc,
            samplesheet,
            sequencers,
        } => {
            let mut options = PlanOptions::new().with_archive_threads(archive_threads);
            if skip_tar {
                options = options.without_archive();
            }
            if skip_qc {
                options = options.without_qc();
            }
            let inputs = Inputs {
                inputdir,
                outputdir,
                samplesheet,
                sequencers,
            };
            prepare(inputs, ProjectSelector::named(project), threads, options).await?;
        }
        Commands::Run { capacity, tasks } => {
            let tasks = tasks.iter().map(|t| parse_task(t)).collect::<Result<Vec<_>>>()?;
            let results = scheduler(capacity).run(tasks).await?;
            println!("{}", serde_json::to_string_pretty(&results.into_outputs())?);
        }
    }

    Ok(())
}

/// Paths given to `prepare`.
struct Inputs {
    inputdir: PathBuf,
    outputdir: PathBuf,
    samplesheet: Option<PathBuf>,
    sequencers: Option<PathBuf>,
}

async fn prepare(inputs: Inputs, selector: ProjectSelector, threads: Weight, options: PlanOptions) -> Result<()> {
    let Inputs {
        inputdir,
        outputdir,
        samplesheet,
        sequencers,
    } = inputs;
    seqpost_plan::validate_output_dir(&outputdir).await?;

    let mut tools = REQUIRED_TOOLS.to_vec();
    if !options.skip_qc {
        tools.push(QC_TOOL);
    }
    seqpost_plan::check_tools(tools)?;

    let layout = seqpost_plan::discover(&inputdir, &selector)
        .await
        .with_context(|| format!("Failed to read run directory {}", inputdir.display()))?;
    if layout.projects.is_empty() {
        bail!("No projects found in {}", inputdir.display());
    }
    info!(
        "Found {} projects with {} files in {}",
        layout.projects.len(),
        layout.file_count(),
        inputdir.display()
    );

    let names = match &sequencers {
        Some(path) => Some(
            SequencerNames::load(path)
                .await
                .with_context(|| format!("Failed to read sequencer map {}", path.display()))?,
        ),
        None => {
            warn!("No sequencer map given (--sequencers or {})", seqpost_plan::SEQUENCERS_ENV);
            None
        }
    };
    let run = seqpost_plan::summarize_run(&inputdir, names.as_ref()).await?;
    info!("{}", run.headline());

    let plan = seqpost_plan::plan(&layout, &outputdir, &options);
    seqpost_plan::prepare_output(&outputdir, &plan.qc_dirs).await?;

    if let Some(sheet) = samplesheet {
        let copied = seqpost_plan::copy_into(&sheet, &outputdir)
            .await
            .with_context(|| format!("Failed to copy sample sheet {}", sheet.display()))?;
        info!("Copied sample sheet to {}", copied.display());
    }

    let scheduler = scheduler(threads);
    let mut results = scheduler.run(plan.tasks).await?;
    if !plan.bundles.is_empty() {
        results.merge(scheduler.run(plan.bundles).await?);
    }
    report_failures(&results);

    let report = RunReport::new(&plan.counts, results).with_run(run);
    let path = outputdir.join("results.json");
    tokio::fs::write(&path, serde_json::to_vec_pretty(&report)?)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if let Some(run) = &report.run {
        println!("{}", run.headline());
    }
    println!("Read counts ({} files)", report.counts.len());
    for count in &report.counts {
        let reads = count.reads.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
        let lane = count.lane.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
        println!("  {}\tL{}\t{}/{}: {}", count.project, lane, count.sample, count.file, reads);
    }
    for total in &report.totals {
        println!("{}: {} reads, archive {}", total.project, total.reads, total.archive);
    }
    println!("Total reads: {}", report.total_reads());
    println!("Results written to {}", path.display());

    Ok(())
}

fn scheduler(capacity: Weight) -> CommandScheduler {
    CommandScheduler::new(Arc::new(ShellLauncher::new()))
        .with_config(SchedulerConfig::new().with_capacity(capacity))
}

fn report_failures(results: &ResultStore) {
    for (command, result) in results.failures() {
        match (&result.launch_error, result.exit_code) {
            (Some(error), _) => warn!(error = %error, "Command did not start: {}", command),
            (None, Some(code)) => warn!(code, "Command failed: {}", command),
            (None, None) => warn!("Command killed by signal: {}", command),
        }
    }
}

/// Parse `WEIGHT=COMMAND`.
fn parse_task(arg: &str) -> Result<Task> {
    let Some((weight, command)) = arg.split_once('=') else {
        bail!("Expected WEIGHT=COMMAND, got {arg:?}");
    };
    let weight: Weight = weight
        .trim()
        .parse()
        .with_context(|| format!("Invalid weight in {arg:?}"))?;
    if command.trim().is_empty() {
        bail!("Empty command in {arg:?}");
    }
    Ok(Task::new(command, weight))
}
