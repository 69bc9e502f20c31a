//! Planning errors.

use std::path::PathBuf;

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;

/// Errors raised while inspecting a run directory or preparing output.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad project name pattern
    #[error("invalid project pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Input path is not a directory
    #[error("{} is not an existing directory", .0.display())]
    InputDir(PathBuf),

    /// Named project missing from the input directory
    #[error("project {project} does not exist in directory {}", .root.display())]
    ProjectNotFound { project: String, root: PathBuf },

    /// Output directory already exists
    #[error("directory {} already exists", .0.display())]
    OutputExists(PathBuf),

    /// Output directory parent does not exist
    #[error("parent directory for {} does not exist", .0.display())]
    OutputParentMissing(PathBuf),

    /// Output path is an existing file
    #[error("{} is a preexisting file", .0.display())]
    OutputIsFile(PathBuf),

    /// Required program not found on PATH
    #[error("{0} is not in the path")]
    MissingTool(String),

    /// No run description next to the input directory
    #[error("could not find the RunInfo.xml file at {}", .0.display())]
    RunInfoMissing(PathBuf),

    /// Run description present but unusable
    #[error("invalid run info: {0}")]
    RunInfo(String),

    /// Malformed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
