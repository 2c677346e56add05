//! Third-party library bundles.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::error::{write_file, PipelineError};
use crate::scripts::process_script;
use crate::styles::process_css;
use crate::task::TaskOutput;

/// Concatenate and minify the configured script libraries.
pub fn bundle_js(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    if config.libs.js.is_empty() {
        return Ok(TaskOutput::default());
    }

    let output = config.src_path(&config.libs.js_output);
    let joined = concat(&config.libs.js)?;
    let code = process_script(&joined, &output, None)?;

    write_file(&output, code)?;
    Ok(TaskOutput::written(vec![output]))
}

/// Concatenate, prefix and minify the configured stylesheet libraries.
pub fn bundle_css(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    if config.libs.css.is_empty() {
        return Ok(TaskOutput::default());
    }

    let output = config.src_path(&config.libs.css_output);
    let joined = concat(&config.libs.css)?;
    let processed = process_css(&joined, &output, &config.styles.browsers, None)?;

    write_file(&output, processed.code)?;
    Ok(TaskOutput::written(vec![output]))
}

/// Join files in order with a newline between each.
fn concat(paths: &[PathBuf]) -> Result<String, PipelineError> {
    let parts = paths
        .iter()
        .map(|path| read(path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(parts.join("\n"))
}

fn read(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|e| PipelineError::read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_with_libs(root: &Path, js: &[&str], css: &[&str]) -> PipelineConfig {
        let mut config = PipelineConfig {
            src: root.join("src"),
            ..Default::default()
        };
        config.libs.js = js.iter().map(|p| root.join(p)).collect();
        config.libs.css = css.iter().map(|p| root.join(p)).collect();
        config
    }

    #[test]
    fn bundles_scripts_in_order() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.js"), "window.first = 'alpha';").unwrap();
        fs::write(temp.path().join("b.js"), "window.second = 'beta';").unwrap();

        let config = config_with_libs(temp.path(), &["a.js", "b.js"], &[]);
        let output = bundle_js(&config).unwrap();

        let bundle = temp.path().join("src/js/libs.min.js");
        assert_eq!(output.written, vec![bundle.clone()]);

        let code = fs::read_to_string(bundle).unwrap();
        let first = code.find("alpha").unwrap();
        let second = code.find("beta").unwrap();
        assert!(first < second);
    }

    #[test]
    fn bundles_stylesheets() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("popup.css"), "/* popup */\n.mfp-bg { opacity: 0.8; }").unwrap();
        fs::write(temp.path().join("theme.css"), ".mfp-wrap { display: flex; }").unwrap();

        let config = config_with_libs(temp.path(), &[], &["popup.css", "theme.css"]);
        bundle_css(&config).unwrap();

        let css = fs::read_to_string(temp.path().join("src/css/libs.min.css")).unwrap();
        assert!(css.contains(".mfp-bg{opacity:.8}"));
        assert!(css.contains(".mfp-wrap{"));
        assert!(!css.contains("popup */"));
    }

    #[test]
    fn missing_library_is_fatal() {
        let temp = tempdir().unwrap();
        let config = config_with_libs(temp.path(), &["node_modules/nope.js"], &[]);

        assert!(matches!(bundle_js(&config), Err(PipelineError::Read { .. })));
    }

    #[test]
    fn empty_list_writes_nothing() {
        let temp = tempdir().unwrap();
        let config = config_with_libs(temp.path(), &[], &[]);

        assert_eq!(bundle_js(&config).unwrap(), TaskOutput::default());
        assert_eq!(bundle_css(&config).unwrap(), TaskOutput::default());
        assert!(!temp.path().join("src").exists());
    }
}
