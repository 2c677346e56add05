//! The task graph.

use std::fmt;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::{clean, copy, includes, libs, scripts, sprite, styles};

/// A single pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Empty the output tree
    Clean,
    /// Concatenate and minify third-party scripts
    JsLibs,
    /// Down-level and minify the app script
    Scripts,
    /// Concatenate, prefix and minify third-party stylesheets
    CssLibs,
    /// Compile, prefix and minify the Sass entry
    Styles,
    /// Merge icons into the sprite
    Sprite,
    /// Copy compiled assets and pages into the output tree
    Copy,
    /// Expand includes in the output tree
    Includes,
}

/// Stages of a full build, in order.
pub const BUILD: &[Task] = &[
    Task::Clean,
    Task::JsLibs,
    Task::Scripts,
    Task::CssLibs,
    Task::Styles,
    Task::Copy,
    Task::Includes,
    Task::Sprite,
];

/// Stages run once before the dev server starts.
pub const DEV: &[Task] = &[
    Task::JsLibs,
    Task::Scripts,
    Task::CssLibs,
    Task::Styles,
    Task::Sprite,
];

/// Files touched by a task run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutput {
    /// Files written
    pub written: Vec<PathBuf>,
    /// Files or directories removed
    pub removed: Vec<PathBuf>,
}

impl TaskOutput {
    pub(crate) fn written(paths: Vec<PathBuf>) -> Self {
        Self {
            written: paths,
            removed: Vec::new(),
        }
    }
}

impl Task {
    /// Stable task name used in logs and messages.
    pub fn name(self) -> &'static str {
        match self {
            Task::Clean => "clean",
            Task::JsLibs => "js-libs",
            Task::Scripts => "scripts",
            Task::CssLibs => "css-libs",
            Task::Styles => "styles",
            Task::Sprite => "sprite",
            Task::Copy => "copy",
            Task::Includes => "includes",
        }
    }

    /// Run the task against `config`.
    pub fn run(self, config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
        match self {
            Task::Clean => clean::clean_dist(config),
            Task::JsLibs => libs::bundle_js(config),
            Task::Scripts => scripts::compile_scripts(config),
            Task::CssLibs => libs::bundle_css(config),
            Task::Styles => styles::compile_styles(config),
            Task::Sprite => sprite::build_sprite(config),
            Task::Copy => copy::copy_to_dist(config),
            Task::Includes => includes::resolve_includes(config),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_cleans_first_and_sprites_last() {
        assert_eq!(BUILD.first(), Some(&Task::Clean));
        assert_eq!(BUILD.last(), Some(&Task::Sprite));

        let copy = BUILD.iter().position(|t| *t == Task::Copy).unwrap();
        let includes = BUILD.iter().position(|t| *t == Task::Includes).unwrap();
        assert!(copy < includes);
    }

    #[test]
    fn dev_never_touches_dist() {
        assert!(!DEV.contains(&Task::Clean));
        assert!(!DEV.contains(&Task::Copy));
        assert!(!DEV.contains(&Task::Includes));
    }
}
