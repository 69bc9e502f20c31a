//! Output directory preparation and external tool checks.

use crate::error::{PlanError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Programs every run needs.
pub const REQUIRED_TOOLS: &[&str] = &["tar", "pigz"];

/// Program needed for QC.
pub const QC_TOOL: &str = "falco";

/// Check that `path` can become a fresh output directory.
///
/// It must not exist yet and its parent must be an existing directory.
pub async fn validate_output_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let meta = fs::metadata(path).await.ok();
    if meta.as_ref().map(|m| m.is_dir()).unwrap_or(false) {
        return Err(PlanError::OutputExists(path.to_path_buf()));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !fs::metadata(&parent).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(PlanError::OutputParentMissing(path.to_path_buf()));
    }

    if meta.is_some() {
        return Err(PlanError::OutputIsFile(path.to_path_buf()));
    }

    Ok(())
}

/// Create the output directory and every directory in `extra`.
pub async fn prepare_output(output: &Path, extra: &[PathBuf]) -> Result<()> {
    fs::create_dir(output).await?;
    for dir in extra {
        fs::create_dir_all(dir).await?;
    }
    debug!("Prepared {} with {} subdirectories", output.display(), extra.len());
    Ok(())
}

/// Copy a file into `output`, keeping its name.
pub async fn copy_into(file: &Path, output: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{} has no file name", file.display())))?;
    let target = output.join(name);
    fs::copy(file, &target).await?;
    Ok(target)
}

/// Fail with the first of `programs` that is not on `PATH`.
pub fn check_tools<'a>(programs: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for program in programs {
        match which::which(program) {
            Ok(path) => debug!("Found {} at {}", program, path.display()),
            Err(_) => return Err(PlanError::MissingTool(program.to_string())),
        }
    }
    Ok(())
}
