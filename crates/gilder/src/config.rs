//! Configuration file (gilder.toml).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gilder_pipeline::PipelineConfig;
use gilder_server::DevServerConfig;
use serde::Deserialize;

/// Everything `gilder.toml` can hold. Pipeline settings live at the top
/// level, dev server settings under `[server]`.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub server: DevServerConfig,
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {}, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_defaults() {
        let temp = tempdir().unwrap();

        let config = load(&temp.path().join("gilder.toml")).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn reads_pipeline_and_server_sections() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gilder.toml");
        fs::write(
            &path,
            r#"
src = "site"
dist = "public"

[libs]
js = ["vendor/a.js"]
css = []

[styles]
source_map = false

[server]
port = 8080
"#,
        )
        .unwrap();

        let config = load(&path).unwrap();

        assert_eq!(config.pipeline.src, PathBuf::from("site"));
        assert_eq!(config.pipeline.dist, PathBuf::from("public"));
        assert_eq!(config.pipeline.libs.js, vec![PathBuf::from("vendor/a.js")]);
        assert!(config.pipeline.libs.css.is_empty());
        assert!(!config.pipeline.styles.source_map);
        assert_eq!(config.pipeline.scripts.entry, PathBuf::from("js/main.js"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gilder.toml");
        fs::write(&path, "[server]\nport = \"eighty\"").unwrap();

        let err = load(&path).unwrap_err();

        assert!(err.to_string().contains("Failed to parse"));
    }
}
