//! Glob matching against source-relative paths.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::error::PipelineError;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A set of include globs minus a set of exclude globs.
///
/// `*` never crosses a directory boundary; `**` spans any number of
/// directories, including none.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathMatcher {
    /// Compile include and exclude patterns.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, PipelineError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Whether `relative` matches an include pattern and no exclude pattern.
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.iter().any(|p| p.matches_path_with(relative, OPTIONS))
            && !self.exclude.iter().any(|p| p.matches_path_with(relative, OPTIONS))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, PipelineError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p.as_ref()).map_err(|e| PipelineError::Pattern {
                pattern: p.as_ref().to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_stays_in_one_directory() {
        let matcher = PathMatcher::new(&["*.html"], &[]).unwrap();

        assert!(matcher.matches(Path::new("index.html")));
        assert!(!matcher.matches(Path::new("parts/header.html")));
    }

    #[test]
    fn double_star_spans_directories() {
        let matcher = PathMatcher::new(&["assets/**/*"], &[]).unwrap();

        assert!(matcher.matches(Path::new("assets/logo.png")));
        assert!(matcher.matches(Path::new("assets/fonts/a/b.woff2")));
        assert!(!matcher.matches(Path::new("css/main.min.css")));
    }

    #[test]
    fn excludes_win() {
        let matcher = PathMatcher::new(&["js/**/*.js"], &["js/**/*.min.js"]).unwrap();

        assert!(matcher.matches(Path::new("js/main.js")));
        assert!(matcher.matches(Path::new("js/modules/menu.js")));
        assert!(!matcher.matches(Path::new("js/main.min.js")));
    }

    #[test]
    fn rejects_bad_patterns() {
        let result = PathMatcher::new(&["a/***"], &[]);

        assert!(matches!(result, Err(PipelineError::Pattern { .. })));
    }
}
