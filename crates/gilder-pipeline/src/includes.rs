//! Include expansion for the output tree.

use std::fs;

use gilder_ssi::IncludeResolver;
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{write_file, PipelineError};
use crate::task::TaskOutput;

/// Expand include directives in every HTML file of the output tree, in place.
///
/// Includes resolve against the source tree, which always holds the fragments.
/// The fragment directory is removed from the output tree afterwards.
pub fn resolve_includes(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    let resolver = IncludeResolver::new(&config.src);
    let fragments = config.dist_path(&config.includes.fragments);
    let mut output = TaskOutput::default();

    let mut pages = Vec::new();
    for entry in WalkDir::new(&config.dist).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::read(e.path().unwrap_or(&config.dist), &e))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("html")
            && !path.starts_with(&fragments)
        {
            pages.push(entry.into_path());
        }
    }

    for page in pages {
        let Ok(relative) = page.strip_prefix(&config.dist) else {
            continue;
        };

        let source = fs::read_to_string(&page).map_err(|e| PipelineError::read(&page, e))?;
        let html = resolver.render(&source, &config.src_path(relative))?;

        if html != source {
            write_file(&page, html)?;
            output.written.push(page);
        }
    }

    if fragments.exists() {
        fs::remove_dir_all(&fragments).map_err(|e| PipelineError::write(&fragments, e))?;
        output.removed.push(fragments);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::copy_to_dist;
    use tempfile::tempdir;

    #[test]
    fn inlines_header_and_drops_fragments() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dist = temp.path().join("dist");
        fs::create_dir_all(src.join("parts")).unwrap();
        fs::write(src.join("parts/header.html"), "<header>Logo</header>").unwrap();
        fs::write(
            src.join("main.html"),
            r#"<body><!--#include virtual="parts/header.html" --></body>"#,
        )
        .unwrap();
        // A stale fragment copy in dist must not survive
        fs::create_dir_all(dist.join("parts")).unwrap();
        fs::write(dist.join("parts/header.html"), "stale").unwrap();

        let config = PipelineConfig {
            src,
            dist: dist.clone(),
            ..Default::default()
        };
        copy_to_dist(&config).unwrap();
        let output = resolve_includes(&config).unwrap();

        assert_eq!(
            fs::read_to_string(dist.join("main.html")).unwrap(),
            "<body><header>Logo</header></body>"
        );
        assert!(!dist.join("parts").exists());
        assert_eq!(output.written, vec![dist.join("main.html")]);
    }

    #[test]
    fn missing_output_tree_is_an_error() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            src: temp.path().join("src"),
            dist: temp.path().join("dist"),
            ..Default::default()
        };

        match resolve_includes(&config) {
            Err(PipelineError::Read { path, .. }) => assert_eq!(path, temp.path().join("dist")),
            other => panic!("expected a read error, got {:?}", other),
        }
    }

    #[test]
    fn missing_fragment_is_an_error() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("index.html"), r#"<!--#include virtual="parts/nav.html" -->"#).unwrap();

        let config = PipelineConfig {
            src: temp.path().join("src"),
            dist,
            ..Default::default()
        };

        assert!(matches!(
            resolve_includes(&config),
            Err(PipelineError::Include(_))
        ));
    }
}
