//! Output tree cleaner.

use std::fs;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::task::TaskOutput;

/// Remove everything inside the output tree, keeping the directory itself.
pub fn clean_dist(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    let dist = &config.dist;

    if !dist.exists() {
        fs::create_dir_all(dist).map_err(|e| PipelineError::write(dist, e))?;
        return Ok(TaskOutput::default());
    }

    let entries = fs::read_dir(dist).map_err(|e| PipelineError::read(dist, e))?;
    let mut removed = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::read(dist, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| PipelineError::read(&path, e))?;

        let result = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| PipelineError::write(&path, e))?;

        removed.push(path);
    }

    removed.sort();
    tracing::debug!("Removed {} entries from {}", removed.len(), dist.display());

    Ok(TaskOutput {
        written: Vec::new(),
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empties_existing_dist() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("css")).unwrap();
        fs::write(dist.join("index.html"), "old").unwrap();
        fs::write(dist.join("css/main.min.css"), "old").unwrap();

        let config = PipelineConfig {
            dist: dist.clone(),
            ..Default::default()
        };
        let output = clean_dist(&config).unwrap();

        assert_eq!(output.removed.len(), 2);
        assert!(dist.exists());
        assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
    }

    #[test]
    fn creates_missing_dist() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            dist: temp.path().join("dist"),
            ..Default::default()
        };

        clean_dist(&config).unwrap();

        assert!(temp.path().join("dist").is_dir());
    }
}
