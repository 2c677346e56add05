//! SVG sprite builder.
//!
//! Each icon in the icon directory is minified, gets its IDs prefixed with the
//! file's base name, loses its presentational attributes, and becomes one
//! `<symbol>` of a single sprite document.

pub mod markup;
pub mod optimize;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::{write_file, PipelineError};
use crate::task::TaskOutput;
use markup::{Element, Node};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

const PROLOGUE: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#
);

/// A processed icon, ready to become a symbol.
#[derive(Debug, Clone)]
pub struct Icon {
    /// File base name, used as the symbol id
    pub name: String,
    /// Source file
    pub path: PathBuf,
    /// Cleaned `<svg>` root
    pub root: Element,
}

/// Build the sprite from the configured icon directory.
///
/// A missing or empty icon directory writes nothing.
pub fn build_sprite(config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
    let dir = config.src_path(&config.sprite.icons);
    if !dir.is_dir() {
        tracing::debug!("No icon directory at {}", dir.display());
        return Ok(TaskOutput::default());
    }

    let files = icon_files(&dir)?;
    if files.is_empty() {
        return Ok(TaskOutput::default());
    }

    let icons = files
        .par_iter()
        .map(|path| load_icon(path))
        .collect::<Result<Vec<_>, _>>()?;

    let output = config.src_path(&config.sprite.output);
    let sprite = merge(icons)?;
    write_file(&output, sprite)?;

    Ok(TaskOutput::written(vec![output]))
}

/// `*.svg` files directly inside `dir`, sorted by name.
fn icon_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::read(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::read(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("svg") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Read and clean a single icon.
pub fn load_icon(path: &Path) -> Result<Icon, PipelineError> {
    let svg_error = |message: String| PipelineError::Svg {
        path: path.to_path_buf(),
        message,
    };

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| svg_error("file name is not valid UTF-8".to_string()))?
        .to_string();

    let source = fs::read_to_string(path).map_err(|e| PipelineError::read(path, e))?;
    let nodes = optimize::minify(markup::parse(&source).map_err(|e| svg_error(e.to_string()))?);

    let mut elements = nodes.into_iter().filter_map(|n| match n {
        Node::Element(e) => Some(e),
        _ => None,
    });
    let mut root = match elements.next() {
        Some(root) if root.name == "svg" => root,
        Some(root) => return Err(svg_error(format!("root element is <{}>", root.name))),
        None => return Err(svg_error("no root element".to_string())),
    };

    optimize::cleanup_ids(&mut root, &format!("{}-", name));
    optimize::strip_presentation(&mut root);

    Ok(Icon {
        name,
        path: path.to_path_buf(),
        root,
    })
}

/// Merge icons into one sprite document, in the given order.
///
/// Symbol IDs are the icon names. An inner ID already held by a symbol or by
/// an earlier icon is renamed.
pub fn merge(icons: Vec<Icon>) -> Result<String, PipelineError> {
    let mut sprite = Element::new("svg");
    sprite.set_attr("xmlns", SVG_NS);

    let mut defs = Element::new("defs");
    let mut symbols = Vec::with_capacity(icons.len());
    let mut taken = HashSet::new();

    for icon in &icons {
        if !taken.insert(icon.name.clone()) {
            return Err(PipelineError::Svg {
                path: icon.path.clone(),
                message: format!("another icon is already named {}", icon.name),
            });
        }
    }

    for icon in icons {
        let Icon { name, mut root, .. } = icon;

        claim_ids(&name, &mut root, &mut taken);

        for (key, value) in &root.attrs {
            if key.starts_with("xmlns:") && sprite.attr(key).is_none() {
                sprite.set_attr(key, value.clone());
            }
        }

        take_defs(&mut root, &mut defs.children);

        let mut symbol = Element::new("symbol");
        symbol.set_attr("id", name);
        for attr in ["viewBox", "preserveAspectRatio"] {
            if let Some(value) = root.attr(attr) {
                symbol.set_attr(attr, value);
            }
        }
        symbol.children = root.children;

        symbols.push(Node::Element(symbol));
    }

    if !defs.children.is_empty() {
        sprite.children.push(Node::Element(defs));
    }
    sprite.children.extend(symbols);

    Ok(format!("{}{}", PROLOGUE, sprite.to_markup()))
}

/// Reserve the IDs inside `root`, renaming any that are already taken to a
/// fresh `<name>-<short id>`.
fn claim_ids(name: &str, root: &mut Element, taken: &mut HashSet<String>) {
    let mut ids = Vec::new();
    for child in root.elements() {
        child.walk(&mut |e| {
            if let Some(id) = e.attr("id") {
                ids.push(id.to_string());
            }
        });
    }

    let mut renames = HashMap::new();
    let mut counter = 0;
    for id in ids {
        if taken.insert(id.clone()) {
            continue;
        }
        let fresh = loop {
            let candidate = format!("{}-{}", name, optimize::short_id(counter));
            counter += 1;
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        tracing::debug!("Renaming id {} of icon {} to {}", id, name, fresh);
        renames.insert(id, fresh);
    }

    if !renames.is_empty() {
        optimize::rename_ids(root, &renames);
    }
}

/// Move the children of every `<defs>` under `element` into `into`, dropping
/// the emptied `<defs>` elements.
fn take_defs(element: &mut Element, into: &mut Vec<Node>) {
    let children = std::mem::take(&mut element.children);

    for child in children {
        match child {
            Node::Element(defs) if defs.name == "defs" => into.extend(defs.children),
            Node::Element(mut e) => {
                take_defs(&mut e, into);
                element.children.push(Node::Element(e));
            }
            other => element.children.push(other),
        }
    }
}
