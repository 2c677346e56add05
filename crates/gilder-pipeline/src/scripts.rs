//! JavaScript down-leveling and minification.

use std::fs;
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::config::PipelineConfig;
use crate::error::{write_file, PipelineError};
use crate::task::TaskOutput;

/// Compile the app entry script into `<name>.min.js` next to it.
pub fn compile_scripts(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    let entry = config.src_path(&config.scripts.entry);
    let output = config.script_output();

    let source = fs::read_to_string(&entry).map_err(|e| PipelineError::read(&entry, e))?;
    let code = process_script(&source, &entry, Some(&config.scripts.target))?;

    write_file(&output, code)?;
    Ok(TaskOutput::written(vec![output]))
}

/// Parse `source` as a classic script, optionally lower it to `target`, then
/// minify it (compress, mangle, no comments).
pub(crate) fn process_script(
    source: &str,
    path: &Path,
    target: Option<&str>,
) -> Result<String, PipelineError> {
    let allocator = Allocator::default();

    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(script_error(path, parsed.errors.iter().map(|e| e.to_string())));
    }
    let mut program = parsed.program;

    if let Some(target) = target {
        let options = TransformOptions::from_target(target).map_err(|message| {
            PipelineError::Script {
                path: path.to_path_buf(),
                message,
            }
        })?;

        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let transformed =
            Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);

        if !transformed.errors.is_empty() {
            return Err(script_error(path, transformed.errors.iter().map(|e| e.to_string())));
        }
    }

    let minified = Minifier::new(MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::default()),
    })
    .build(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(code)
}

fn script_error(path: &Path, messages: impl Iterator<Item = String>) -> PipelineError {
    PipelineError::Script {
        path: path.to_path_buf(),
        message: messages.collect::<Vec<_>>().join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const APP: &str = r#"
// Toggle the mobile menu
const menu = document.querySelector('.menu');
const toggle = (open) => {
    menu.classList.toggle('is-open', open);
};
toggle(true);
"#;

    #[test]
    fn writes_min_js_next_to_entry() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("js")).unwrap();
        fs::write(src.join("js/main.js"), APP).unwrap();

        let config = PipelineConfig {
            src: src.clone(),
            ..Default::default()
        };
        let output = compile_scripts(&config).unwrap();

        assert_eq!(output.written, vec![src.join("js/main.min.js")]);
        let code = fs::read_to_string(src.join("js/main.min.js")).unwrap();
        assert!(code.len() < APP.len());
        assert!(code.contains("querySelector"));
        assert!(!code.contains("Toggle the mobile menu"));
    }

    #[test]
    fn minifies_without_target() {
        let code = process_script("var a = 1 + 2;\n\n\nconsole.log( a );", Path::new("lib.js"), None).unwrap();

        assert!(!code.contains("\n\n"));
        assert!(code.contains("console.log"));
    }

    #[test]
    fn reports_syntax_errors() {
        let result = process_script("function (", Path::new("broken.js"), Some("es2015"));

        assert!(matches!(result, Err(PipelineError::Script { .. })));
    }

    #[test]
    fn rejects_unknown_targets() {
        let result = process_script("let a = 1;", Path::new("main.js"), Some("netscape4"));

        assert!(matches!(result, Err(PipelineError::Script { .. })));
    }
}
