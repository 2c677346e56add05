//! Mapping from changed source files to pipeline work.

use std::path::Path;

use gilder_pipeline::{PathMatcher, PipelineConfig, PipelineError, Task};

/// What a matching change triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// Re-run a task; its result reaches browsers through the pipeline's notifier
    Run(Task),
    /// Reload browsers without running anything
    Reload,
}

/// One row of the watch table.
#[derive(Debug, Clone)]
pub struct WatchRule {
    matcher: PathMatcher,
    pub action: WatchAction,
}

impl WatchRule {
    /// Rule matching `patterns` but none of `ignore`.
    pub fn new<S: AsRef<str>>(
        patterns: &[S],
        ignore: &[S],
        action: WatchAction,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            matcher: PathMatcher::new(patterns, ignore)?,
            action,
        })
    }

    pub fn matches(&self, relative: &Path) -> bool {
        self.matcher.matches(relative)
    }
}

/// Work collected from one batch of changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Tasks to run, each once, in the order first triggered
    pub tasks: Vec<Task>,
    /// Whether browsers should reload after the tasks
    pub reload: bool,
}

/// Ordered watch rules; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct WatchTable {
    rules: Vec<WatchRule>,
}

impl WatchTable {
    pub fn new(rules: Vec<WatchRule>) -> Self {
        Self { rules }
    }

    /// The dev-mode table, derived from where each task reads its sources.
    ///
    /// Generated bundles (`*.min.js`, the sprite) never match, so a task's own
    /// output cannot trigger it again.
    pub fn from_config(
        config: &PipelineConfig,
        reload_extensions: &[String],
    ) -> Result<Self, PipelineError> {
        let styles_dir = parent(&config.styles.entry);
        let scripts_dir = parent(&config.scripts.entry);

        let mut rules = vec![
            WatchRule::new(
                &[under(styles_dir, "**/*.scss")],
                &[],
                WatchAction::Run(Task::Styles),
            )?,
            WatchRule::new(
                &[under(scripts_dir, "**/*.js")],
                &[under(scripts_dir, "**/*.min.js")],
                WatchAction::Run(Task::Scripts),
            )?,
            WatchRule::new(
                &[under(&config.sprite.icons, "*.svg")],
                &[],
                WatchAction::Run(Task::Sprite),
            )?,
        ];

        if !reload_extensions.is_empty() {
            let patterns: Vec<String> = reload_extensions
                .iter()
                .map(|ext| format!("**/*.{}", ext))
                .collect();
            rules.push(WatchRule::new(&patterns, &[], WatchAction::Reload)?);
        }

        Ok(Self::new(rules))
    }

    /// Action for a path relative to the source root.
    pub fn dispatch(&self, relative: &Path) -> Option<WatchAction> {
        self.rules
            .iter()
            .find(|rule| rule.matches(relative))
            .map(|rule| rule.action)
    }

    /// Collapse a batch of changed paths into the work to do.
    pub fn plan<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Batch {
        let mut batch = Batch::default();

        for path in paths {
            match self.dispatch(path) {
                Some(WatchAction::Run(task)) if !batch.tasks.contains(&task) => {
                    batch.tasks.push(task)
                }
                Some(WatchAction::Reload) => batch.reload = true,
                _ => {}
            }
        }

        batch
    }
}

fn parent(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

/// Join a glob onto a directory, with `/` separators.
fn under(dir: &Path, pattern: &str) -> String {
    let dir = dir.to_string_lossy().replace('\\', "/");
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        pattern.to_string()
    } else {
        format!("{}/{}", dir, pattern)
    }
}
