//! Directive extraction.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// How an include path is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// `file="..."`, relative to the including file
    File,
    /// `virtual="..."`, relative to the document root
    Virtual,
}

/// What a directive asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Inline another file
    Include { kind: IncludeKind, path: String },

    /// Assign a document variable
    Set { var: String, value: String },

    /// Print a document variable
    Echo { var: String },

    /// A directive this crate does not understand; left in the output untouched
    Unsupported { name: String },
}

/// A directive found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Byte range of the whole `<!--# ... -->` comment
    pub span: Range<usize>,

    /// Parsed directive
    pub kind: DirectiveKind,
}

/// Find every directive in `source`, in document order.
pub fn parse_directives(source: &str) -> Vec<Directive> {
    static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<!--#([A-Za-z]+)((?:\s+[\w-]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*-->"#)
            .expect("Invalid directive regex")
    });

    DIRECTIVE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str();
            let attrs = parse_attributes(caps.get(2).map(|m| m.as_str()).unwrap_or(""));

            Some(Directive {
                span: whole.range(),
                kind: classify(name, &attrs),
            })
        })
        .collect()
}

fn classify(name: &str, attrs: &HashMap<String, String>) -> DirectiveKind {
    let unsupported = || DirectiveKind::Unsupported {
        name: name.to_string(),
    };

    match name.to_ascii_lowercase().as_str() {
        "include" => {
            if let Some(path) = attrs.get("virtual") {
                DirectiveKind::Include {
                    kind: IncludeKind::Virtual,
                    path: path.clone(),
                }
            } else if let Some(path) = attrs.get("file") {
                DirectiveKind::Include {
                    kind: IncludeKind::File,
                    path: path.clone(),
                }
            } else {
                unsupported()
            }
        }
        "set" => match (attrs.get("var"), attrs.get("value")) {
            (Some(var), Some(value)) => DirectiveKind::Set {
                var: var.clone(),
                value: value.clone(),
            },
            _ => unsupported(),
        },
        "echo" => match attrs.get("var") {
            Some(var) => DirectiveKind::Echo { var: var.clone() },
            None => unsupported(),
        },
        _ => unsupported(),
    }
}

fn parse_attributes(source: &str) -> HashMap<String, String> {
    static ATTR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"([\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid attribute regex")
    });

    ATTR.captures_iter(source)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((key, value))
        })
        .collect()
}
