//! Run planning - from a sequencing run directory to a weighted task list.

#![warn(missing_docs)]

mod error;
pub mod layout;
pub mod quote;
pub mod report;
pub mod run_info;
pub mod tasks;
pub mod workspace;

pub use error::{PlanError, Result};
pub use layout::{discover, DataFile, Project, ProjectSelector, RunLayout, DEFAULT_PROJECT_PATTERN};
pub use quote::{quote_path, shell_quote};
pub use report::{is_read_file, lane_of, ProjectTotal, ReadCount, RunReport};
pub use run_info::{
    read_footer, run_info_path, summarize_run, RunInfo, RunSummary, SequencerNames, DOWNLOAD_FILE, PROTOCOL_FILE,
    RUN_INFO_FILE, SEQUENCERS_ENV,
};
pub use tasks::{plan, CountJob, Plan, PlanOptions};
pub use workspace::{
    check_tools, copy_into, prepare_output, validate_output_dir, QC_TOOL, REQUIRED_TOOLS,
};
