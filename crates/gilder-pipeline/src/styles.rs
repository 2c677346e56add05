//! Sass compilation, vendor prefixing and CSS minification.

use std::path::Path;

use codemap::SpanLoc;
use grass::OutputStyle;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{write_file, PipelineError};
use crate::task::TaskOutput;

/// Minified stylesheet and its optional source map.
#[derive(Debug, Clone)]
pub(crate) struct ProcessedCss {
    pub code: String,
    pub map: Option<String>,
}

/// Compile the Sass entry into `<output_dir>/<name>.min.css` (plus `.map`).
pub fn compile_styles(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    let entry = config.src_path(&config.styles.entry);
    let output = config.style_output();

    let css = compile_sass(&entry)?;

    let file_name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("main.min.css")
        .to_string();
    let compiled_name = compiled_css_name(&entry);
    let processed = process_css(
        &css,
        &entry,
        &config.styles.browsers,
        config.styles.source_map.then_some(compiled_name.as_str()),
    )?;

    let mut written = Vec::new();
    match processed.map {
        Some(map) => {
            let map_name = format!("{}.map", file_name);
            let map_path = output.with_file_name(&map_name);
            let code = format!("{}\n/*# sourceMappingURL={} */", processed.code, map_name);

            write_file(&output, code)?;
            write_file(&map_path, map)?;
            written.push(output);
            written.push(map_path);
        }
        None => {
            write_file(&output, processed.code)?;
            written.push(output);
        }
    }

    Ok(TaskOutput::written(written))
}

/// `scss/main.scss` -> `main.css`
fn compiled_css_name(entry: &Path) -> String {
    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main");
    format!("{}.css", stem)
}

/// Compile a Sass/SCSS file to expanded CSS.
fn compile_sass(entry: &Path) -> Result<String, PipelineError> {
    let mut options = grass::Options::default()
        .style(OutputStyle::Expanded)
        .quiet(false)
        .logger(&SassLogger);

    if let Some(dir) = entry.parent() {
        options = options.load_path(dir);
    }

    grass::from_path(entry, &options).map_err(|e| PipelineError::Sass {
        path: entry.to_path_buf(),
        message: e.to_string(),
    })
}

/// Prefix for `browsers` and minify `css`, dropping every comment.
///
/// With `map_source`, also emit a source map whose single source has that
/// name, relative to the map file, and carries `css` as its content.
pub(crate) fn process_css(
    css: &str,
    path: &Path,
    browsers: &[String],
    map_source: Option<&str>,
) -> Result<ProcessedCss, PipelineError> {
    let css_error = |message: String| PipelineError::Css {
        path: path.to_path_buf(),
        message,
    };

    let targets = Targets {
        browsers: Browsers::from_browserslist(browsers)
            .map_err(|e| css_error(e.to_string()))?,
        ..Targets::default()
    };

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: map_source
                .map(str::to_string)
                .unwrap_or_else(|| path.display().to_string()),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| css_error(e.to_string()))?;

    // `/*! ... */` comments survive minification unless dropped here
    stylesheet.license_comments.clear();

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let mut map = match map_source {
        Some(name) => {
            let mut map = SourceMap::new("");
            let source = map.add_source(name);
            map.set_source_content(source as usize, css)
                .map_err(|e| css_error(format!("{:?}", e)))?;
            Some(map)
        }
        None => None,
    };

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            source_map: map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let map = match map.as_mut() {
        Some(map) => Some(
            map.to_json(None)
                .map_err(|e| css_error(format!("{:?}", e)))?,
        ),
        None => None,
    };

    Ok(ProcessedCss {
        code: printed.code,
        map,
    })
}

/// Routes Sass `@warn` and `@debug` output through tracing.
#[derive(Debug)]
struct SassLogger;

impl grass::Logger for SassLogger {
    fn debug(&self, location: SpanLoc, message: &str) {
        debug!(
            "{}:{} DEBUG: {}",
            location.file.name(),
            location.begin.line + 1,
            message
        );
    }

    fn warn(&self, location: SpanLoc, message: &str) {
        warn!(
            "Warning: {}\n    ./{}:{}:{}",
            message,
            location.file.name(),
            location.begin.line + 1,
            location.begin.column + 1
        );
    }
}
