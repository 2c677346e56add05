//! Recursive include expansion.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::directive::{parse_directives, DirectiveKind, IncludeKind};

/// Printed by `echo` for a variable that was never set.
const UNSET_VALUE: &str = "(none)";

/// Errors that can occur while expanding includes.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    #[error("Failed to read include {} (from {}): {message}", .path.display(), .from.display())]
    Read {
        path: PathBuf,
        from: PathBuf,
        message: String,
    },

    #[error("Include cycle: {}", format_chain(.chain))]
    Cycle { chain: Vec<PathBuf> },

    #[error("Include {} escapes document root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Expands include directives against a document root.
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    root: PathBuf,
}

impl IncludeResolver {
    /// Create a resolver for the given document root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    /// The document root `virtual` includes resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and expand the file at `path`.
    pub fn render_file(&self, path: &Path) -> Result<String, IncludeError> {
        let source = fs::read_to_string(path).map_err(|e| IncludeError::Read {
            path: path.to_path_buf(),
            from: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render(&source, path)
    }

    /// Expand `source` as if it were the contents of `location`.
    ///
    /// `location` does not need to exist; it only anchors `file` includes and
    /// cycle detection. Variables set by `set` are visible to every file the
    /// document includes after the assignment.
    pub fn render(&self, source: &str, location: &Path) -> Result<String, IncludeError> {
        let mut vars = HashMap::new();
        let mut stack = vec![normalize(location)];
        self.expand(source, &mut vars, &mut stack)
    }

    fn expand(
        &self,
        source: &str,
        vars: &mut HashMap<String, String>,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, IncludeError> {
        let directives = parse_directives(source);
        if directives.is_empty() {
            return Ok(source.to_string());
        }

        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;

        for directive in directives {
            output.push_str(&source[cursor..directive.span.start]);
            cursor = directive.span.end;

            match directive.kind {
                DirectiveKind::Include { kind, path } => {
                    let current = stack.last().cloned().unwrap_or_default();
                    let target = self.resolve(kind, &path, &current)?;

                    if stack.contains(&target) {
                        let mut chain = stack.clone();
                        chain.push(target);
                        return Err(IncludeError::Cycle { chain });
                    }

                    let included = fs::read_to_string(&target).map_err(|e| IncludeError::Read {
                        path: target.clone(),
                        from: current.clone(),
                        message: e.to_string(),
                    })?;

                    stack.push(target);
                    let expanded = self.expand(&included, vars, stack)?;
                    stack.pop();

                    output.push_str(&expanded);
                }
                DirectiveKind::Set { var, value } => {
                    vars.insert(var, value);
                }
                DirectiveKind::Echo { var } => {
                    output.push_str(vars.get(&var).map(String::as_str).unwrap_or(UNSET_VALUE));
                }
                DirectiveKind::Unsupported { name } => {
                    tracing::warn!("Unsupported include directive #{}", name);
                    output.push_str(&source[directive.span]);
                }
            }
        }

        output.push_str(&source[cursor..]);
        Ok(output)
    }

    fn resolve(&self, kind: IncludeKind, path: &str, current: &Path) -> Result<PathBuf, IncludeError> {
        let resolved = match kind {
            IncludeKind::Virtual => normalize(&self.root.join(path.trim_start_matches('/'))),
            IncludeKind::File => {
                let base = current.parent().unwrap_or(Path::new(""));
                normalize(&base.join(path))
            }
        };

        if !resolved.starts_with(&self.root) {
            return Err(IncludeError::OutsideRoot {
                path: resolved,
                root: self.root.clone(),
            });
        }

        Ok(resolved)
    }
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}
