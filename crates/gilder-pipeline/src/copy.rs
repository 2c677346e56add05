//! Build copier.

use std::fs;

use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::matcher::PathMatcher;
use crate::task::TaskOutput;

/// Copy every source file matching the copy patterns into the output tree,
/// keeping its path relative to the source root.
pub fn copy_to_dist(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    let matcher = PathMatcher::new(&config.copy.patterns, &[])?;
    let mut written = Vec::new();

    for entry in WalkDir::new(&config.src)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PipelineError::read(e.path().unwrap_or(&config.src), &e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(&config.src) else {
            continue;
        };

        if !matcher.matches(relative) {
            continue;
        }

        let target = config.dist_path(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
        }
        fs::copy(path, &target).map_err(|e| PipelineError::write(&target, e))?;

        written.push(target);
    }

    Ok(TaskOutput::written(written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn copies_min_assets_pages_and_assets_only() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        for rel in [
            "index.html",
            "about.html",
            "parts/header.html",
            "js/main.js",
            "js/main.min.js",
            "js/libs.min.js",
            "css/main.min.css",
            "css/main.min.css.map",
            "scss/main.scss",
            "assets/img/logo.png",
            "assets/svg-sprite/close.svg",
            "assets/fonts/a.woff2",
        ] {
            touch(&src, rel);
        }

        let config = PipelineConfig {
            src: src.clone(),
            dist: temp.path().join("dist"),
            ..Default::default()
        };
        copy_to_dist(&config).unwrap();

        let dist = temp.path().join("dist");
        for rel in [
            "index.html",
            "about.html",
            "js/main.min.js",
            "js/libs.min.js",
            "css/main.min.css",
            "css/main.min.css.map",
            "assets/img/logo.png",
            "assets/svg-sprite/close.svg",
            "assets/fonts/a.woff2",
        ] {
            assert!(dist.join(rel).exists(), "missing {}", rel);
        }

        assert!(!dist.join("js/main.js").exists());
        assert!(!dist.join("scss").exists());
        assert!(!dist.join("parts").exists());
        assert_eq!(fs::read_to_string(dist.join("index.html")).unwrap(), "index.html");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_fails_the_copy() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        touch(&src, "index.html");
        fs::create_dir_all(src.join("assets")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.png"), src.join("assets/logo.png"))
            .unwrap();

        let config = PipelineConfig {
            src: src.clone(),
            dist: temp.path().join("dist"),
            ..Default::default()
        };

        match copy_to_dist(&config) {
            Err(PipelineError::Read { path, .. }) => assert_eq!(path, src.join("assets/logo.png")),
            other => panic!("expected a read error, got {:?}", other),
        }
    }
}
