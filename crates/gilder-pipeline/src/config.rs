//! Pipeline configuration.
//!
//! A single immutable [`PipelineConfig`] is handed to every task. All source
//! paths except library bundles are relative to [`PipelineConfig::src`];
//! library paths are relative to the working directory (usually the project
//! root holding `node_modules`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration shared by every task.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source tree holding hand-authored assets
    pub src: PathBuf,

    /// Output tree for deployable builds
    pub dist: PathBuf,

    /// Third-party library bundles
    pub libs: LibsConfig,

    /// Application script entry
    pub scripts: ScriptsConfig,

    /// Sass entry and CSS targets
    pub styles: StylesConfig,

    /// SVG sprite input and output
    pub sprite: SpriteConfig,

    /// Files copied into the output tree
    pub copy: CopyConfig,

    /// Include fragments
    pub includes: IncludesConfig,
}

/// Ordered third-party files, one list per asset type.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibsConfig {
    pub js: Vec<PathBuf>,
    pub css: Vec<PathBuf>,
    /// Bundle path for `js`, relative to the source tree
    pub js_output: PathBuf,
    /// Bundle path for `css`, relative to the source tree
    pub css_output: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Entry file, relative to the source tree
    pub entry: PathBuf,
    /// Lowest ECMAScript version the output must run on (e.g. "es2015")
    pub target: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StylesConfig {
    /// Sass entry file, relative to the source tree
    pub entry: PathBuf,
    /// Directory the compiled stylesheet is written to, relative to the source tree
    pub output_dir: PathBuf,
    /// Browserslist queries used for vendor prefixing
    pub browsers: Vec<String>,
    /// Write a `.map` file next to the stylesheet
    pub source_map: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpriteConfig {
    /// Directory of icon files, relative to the source tree
    pub icons: PathBuf,
    /// Sprite file, relative to the source tree
    pub output: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CopyConfig {
    /// Glob patterns matched against paths relative to the source tree
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IncludesConfig {
    /// Fragment directory name, removed from the output tree after expansion
    pub fragments: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src"),
            dist: PathBuf::from("dist"),
            libs: LibsConfig::default(),
            scripts: ScriptsConfig::default(),
            styles: StylesConfig::default(),
            sprite: SpriteConfig::default(),
            copy: CopyConfig::default(),
            includes: IncludesConfig::default(),
        }
    }
}

impl Default for LibsConfig {
    fn default() -> Self {
        Self {
            js: vec![
                PathBuf::from("node_modules/jquery/dist/jquery.min.js"),
                PathBuf::from("node_modules/magnific-popup/dist/jquery.magnific-popup.min.js"),
            ],
            css: vec![PathBuf::from(
                "node_modules/magnific-popup/dist/magnific-popup.css",
            )],
            js_output: PathBuf::from("js/libs.min.js"),
            css_output: PathBuf::from("css/libs.min.css"),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("js/main.js"),
            target: "es2015".to_string(),
        }
    }
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("scss/main.scss"),
            output_dir: PathBuf::from("css"),
            browsers: vec!["last 10 versions".to_string()],
            source_map: true,
        }
    }
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            icons: PathBuf::from("assets/svg-sprite"),
            output: PathBuf::from("assets/sprite.svg"),
        }
    }
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                "js/*.min.*".to_string(),
                "css/*.min.*".to_string(),
                "assets/**/*".to_string(),
                "*.html".to_string(),
            ],
        }
    }
}

impl Default for IncludesConfig {
    fn default() -> Self {
        Self {
            fragments: PathBuf::from("parts"),
        }
    }
}

impl PipelineConfig {
    /// Resolve a path inside the source tree.
    pub fn src_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.src.join(relative)
    }

    /// Resolve a path inside the output tree.
    pub fn dist_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dist.join(relative)
    }

    /// Minified output path for the script entry (`main.js` -> `main.min.js`).
    pub fn script_output(&self) -> PathBuf {
        self.src_path(min_name(&self.scripts.entry, "js"))
    }

    /// Minified output path for the Sass entry (`scss/main.scss` -> `css/main.min.css`).
    pub fn style_output(&self) -> PathBuf {
        let file = min_name(&self.styles.entry, "css");
        let name = file.file_name().map(PathBuf::from).unwrap_or(file);
        self.src_path(&self.styles.output_dir).join(name)
    }
}

/// Replace the extension of `path` with `.min.<ext>`.
fn min_name(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(format!("min.{}", ext))
}
