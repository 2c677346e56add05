//! Per-icon cleanup: minification, ID cleanup and presentation stripping.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::markup::{Element, Node};

/// Attributes removed so icons inherit color from CSS.
pub const PRESENTATION_ATTRS: &[&str] = &["fill", "fill-opacity", "stroke", "style", "data-name"];

/// Elements whose whitespace is content.
const TEXT_CONTENT: &[&str] = &["text", "tspan", "textPath", "title", "desc", "style", "script"];

/// Editor namespaces stripped from icons.
const EDITOR_PREFIXES: &[&str] = &["sodipodi", "inkscape", "sketch"];

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

static URL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?#([^'")\s]+)['"]?\s*\)"#).expect("Invalid url() regex")
});

static ID_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z_][\w-]*)").expect("Invalid id selector regex"));

/// Drop comments, declarations, metadata, editor data and formatting whitespace.
pub fn minify(nodes: Vec<Node>) -> Vec<Node> {
    minify_children(nodes, false)
}

fn minify_children(nodes: Vec<Node>, keep_whitespace: bool) -> Vec<Node> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Comment(_) | Node::Instruction(_) => None,
            Node::Text(t) if !keep_whitespace && t.trim().is_empty() => None,
            Node::Element(e) if e.name == "metadata" || is_editor_name(&e.name) => None,
            Node::Element(mut e) => {
                e.attrs.retain(|(k, _)| !is_editor_name(k) && !is_editor_namespace(k));
                let keep = TEXT_CONTENT.contains(&e.name.as_str());
                e.children = minify_children(std::mem::take(&mut e.children), keep);
                Some(Node::Element(e))
            }
            other => Some(other),
        })
        .collect()
}

fn is_editor_name(name: &str) -> bool {
    name.split_once(':')
        .is_some_and(|(prefix, _)| EDITOR_PREFIXES.contains(&prefix))
}

fn is_editor_namespace(name: &str) -> bool {
    name.strip_prefix("xmlns:")
        .is_some_and(|prefix| EDITOR_PREFIXES.contains(&prefix))
}

/// Rename IDs to short, `prefix`ed names and rewrite every reference.
///
/// Unreferenced IDs are removed. When the icon carries `<style>` or `<script>`
/// (which may reference IDs in ways we cannot see) every ID is kept and only
/// prefixed. Repeated IDs keep their first occurrence.
pub fn cleanup_ids(root: &mut Element, prefix: &str) {
    let mut ids = Vec::new();
    let mut referenced = HashSet::new();
    let mut has_code = false;

    root.walk(&mut |e| {
        if e.name == "style" || e.name == "script" {
            has_code = true;
        }
        for (key, value) in &e.attrs {
            if key == "id" {
                ids.push(value.clone());
            } else if is_href(key) {
                if let Some(id) = value.strip_prefix('#') {
                    referenced.insert(id.to_string());
                }
            }
            for caps in URL_REF.captures_iter(value) {
                referenced.insert(caps[1].to_string());
            }
        }
    });

    let mut renames: HashMap<String, String> = HashMap::new();
    let mut counter = 0;
    for id in ids {
        if renames.contains_key(&id) {
            continue;
        }
        if has_code {
            renames.insert(id.clone(), format!("{}{}", prefix, id));
        } else if referenced.contains(&id) {
            renames.insert(id, format!("{}{}", prefix, short_id(counter)));
            counter += 1;
        }
    }

    let mut assigned = HashSet::new();
    root.walk_mut(&mut |e| {
        let keep = e
            .attr("id")
            .map(|id| renames.contains_key(id) && assigned.insert(id.to_string()));
        if keep == Some(false) {
            e.remove_attr("id");
        }
    });

    rename_ids(root, &renames);
}

/// Rewrite the IDs in `renames` and every reference to them. Other IDs are
/// left alone.
pub fn rename_ids(root: &mut Element, renames: &HashMap<String, String>) {
    root.walk_mut(&mut |e| {
        if let Some(new_id) = e.attr("id").and_then(|id| renames.get(id)).cloned() {
            e.set_attr("id", new_id);
        }

        for (key, value) in e.attrs.iter_mut() {
            if is_href(key) {
                if let Some(new_id) = value.strip_prefix('#').and_then(|id| renames.get(id)) {
                    *value = format!("#{}", new_id);
                    continue;
                }
            }
            if value.contains("url(") {
                *value = rewrite_urls(value, renames);
            }
        }

        if e.name == "style" {
            for child in &mut e.children {
                if let Node::Text(css) = child {
                    *css = rewrite_selectors(css, renames);
                }
            }
        }
    });
}

/// Remove [`PRESENTATION_ATTRS`] from the element and all descendants.
pub fn strip_presentation(root: &mut Element) {
    root.walk_mut(&mut |e| {
        e.attrs
            .retain(|(k, _)| !PRESENTATION_ATTRS.contains(&k.as_str()));
    });
}

fn is_href(key: &str) -> bool {
    key == "href" || key == "xlink:href"
}

fn rewrite_urls(value: &str, renames: &HashMap<String, String>) -> String {
    URL_REF
        .replace_all(value, |caps: &Captures| match renames.get(&caps[1]) {
            Some(new_id) => format!("url(#{})", new_id),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn rewrite_selectors(css: &str, renames: &HashMap<String, String>) -> String {
    ID_SELECTOR
        .replace_all(css, |caps: &Captures| match renames.get(&caps[1]) {
            Some(new_id) => format!("#{}", new_id),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Short ID for the n-th referenced element: a..z, A..Z, aa, ab, ...
pub fn short_id(mut n: usize) -> String {
    let base = ID_ALPHABET.len();
    let mut out = Vec::new();
    loop {
        out.push(ID_ALPHABET[n % base]);
        n /= base;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::markup::{parse, to_markup};
    use pretty_assertions::assert_eq;

    fn root(source: &str) -> Element {
        match minify(parse(source).unwrap()).into_iter().next() {
            Some(Node::Element(e)) => e,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn generates_short_ids() {
        assert_eq!(short_id(0), "a");
        assert_eq!(short_id(25), "z");
        assert_eq!(short_id(26), "A");
        assert_eq!(short_id(51), "Z");
        assert_eq!(short_id(52), "aa");
        assert_eq!(short_id(53), "ab");
    }

    #[test]
    fn minify_drops_noise() {
        let nodes = minify(
            parse(
                r#"<?xml version="1.0"?>
<!-- Generator: Sketch -->
<svg xmlns:sodipodi="http://sodipodi" sodipodi:docname="x.svg">
  <metadata><rdf/></metadata>
  <sodipodi:namedview/>
  <text> A B </text>
</svg>"#,
            )
            .unwrap(),
        );

        assert_eq!(to_markup(&nodes), "<svg><text> A B </text></svg>");
    }

    #[test]
    fn renames_referenced_ids_and_drops_the_rest() {
        let mut svg = root(
            r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><defs><linearGradient id="gradient"/><path id="shape"/></defs><rect id="unused" stroke="url(#gradient)"/><use xlink:href="#shape"/></svg>"##,
        );

        cleanup_ids(&mut svg, "close-");

        assert_eq!(
            svg.to_markup(),
            r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><defs><linearGradient id="close-a"/><path id="close-b"/></defs><rect stroke="url(#close-a)"/><use xlink:href="#close-b"/></svg>"##
        );
    }

    #[test]
    fn prefixes_ids_when_styles_present() {
        let mut svg = root(r#"<svg><style>#dot { opacity: .5 }</style><circle id="dot"/><g id="group"/></svg>"#);

        cleanup_ids(&mut svg, "menu-");

        assert_eq!(
            svg.to_markup(),
            r#"<svg><style>#menu-dot { opacity: .5 }</style><circle id="menu-dot"/><g id="menu-group"/></svg>"#
        );
    }

    #[test]
    fn keeps_first_of_repeated_ids() {
        let mut svg = root(r##"<svg><path id="p"/><path id="p"/><use href="#p"/></svg>"##);

        cleanup_ids(&mut svg, "x-");

        assert_eq!(
            svg.to_markup(),
            r##"<svg><path id="x-a"/><path/><use href="#x-a"/></svg>"##
        );
    }

    #[test]
    fn renames_only_listed_ids() {
        let mut svg = root(
            r##"<svg><style>#tip { opacity: .5 }</style><path id="tip"/><path id="stem"/><use href="#tip"/><rect mask="url(#stem)"/></svg>"##,
        );
        let renames = HashMap::from([("tip".to_string(), "arrow-b".to_string())]);

        rename_ids(&mut svg, &renames);

        assert_eq!(
            svg.to_markup(),
            r##"<svg><style>#arrow-b { opacity: .5 }</style><path id="arrow-b"/><path id="stem"/><use href="#arrow-b"/><rect mask="url(#stem)"/></svg>"##
        );
    }

    #[test]
    fn strips_presentation_everywhere() {
        let mut svg = root(
            r##"<svg fill="none" data-name="Layer 1"><g style="opacity:1" stroke="#000"><path fill="#fff" fill-opacity=".5" d="M0 0"/></g></svg>"##,
        );

        strip_presentation(&mut svg);

        assert_eq!(svg.to_markup(), r#"<svg><g><path d="M0 0"/></g></svg>"#);
    }
}
