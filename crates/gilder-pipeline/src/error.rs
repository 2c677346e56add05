//! Pipeline errors.

use std::path::{Path, PathBuf};

use gilder_ssi::IncludeError;

/// Errors that can occur while running a task.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    #[error("Sass compilation failed: {}: {message}", .path.display())]
    Sass { path: PathBuf, message: String },

    #[error("CSS processing failed: {}: {message}", .path.display())]
    Css { path: PathBuf, message: String },

    #[error("Script processing failed: {}: {message}", .path.display())]
    Script { path: PathBuf, message: String },

    #[error("Invalid SVG icon: {}: {message}", .path.display())]
    Svg { path: PathBuf, message: String },

    #[error("Invalid glob pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    #[error("Include expansion failed: {0}")]
    Include(#[from] IncludeError),
}

impl PipelineError {
    pub(crate) fn read(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Write `contents` to `path`, creating parent directories first.
pub(crate) fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| PipelineError::write(path, e))
}
