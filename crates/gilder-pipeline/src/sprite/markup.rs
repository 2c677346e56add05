//! Owned XML tree for SVG icons.
//!
//! Icons are parsed with roxmltree and copied into a small mutable tree the
//! optimizer can rewrite and serialize.

use roxmltree::{Document, NodeType, ParsingOptions};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A node in an SVG document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    Instruction(String),
}

/// An element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(index).1)
    }

    /// Child elements, skipping text and other nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Visit this element and every descendant element, parents first.
    pub fn walk(&self, f: &mut impl FnMut(&Element)) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    /// Mutable variant of [`Element::walk`].
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.walk_mut(f);
            }
        }
    }

    /// Serialize to markup. Elements without children self-close.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

/// Serialize a list of nodes.
pub fn to_markup(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => write_element(e, out),
        Node::Text(t) => out.push_str(&escape(t, false)),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        Node::Instruction(p) => {
            out.push_str("<?");
            out.push_str(p);
            out.push_str("?>");
        }
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value, true));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn escape(text: &str, attribute: bool) -> String {
    let text = text.replace('&', "&amp;").replace('<', "&lt;");
    if attribute {
        text.replace('"', "&quot;")
    } else {
        text
    }
}

/// Parse an XML document into top-level nodes.
///
/// Entity references, including those declared in the doctype's internal
/// subset, are expanded. CDATA sections become text.
pub fn parse(source: &str) -> Result<Vec<Node>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(source, options)?;

    Ok(document.root().children().filter_map(convert).collect())
}

fn convert(node: roxmltree::Node<'_, '_>) -> Option<Node> {
    match node.node_type() {
        NodeType::Element => Some(Node::Element(convert_element(node))),
        NodeType::Text => node.text().map(|t| Node::Text(t.to_string())),
        NodeType::Comment => node.text().map(|t| Node::Comment(t.to_string())),
        NodeType::PI => node.pi().map(|pi| {
            Node::Instruction(match pi.value {
                Some(value) => format!("{} {}", pi.target, value),
                None => pi.target.to_string(),
            })
        }),
        NodeType::Root => None,
    }
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(qualified_name(node, tag.namespace(), tag.name(), false));

    // Declarations appear on the element that introduces them
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    for ns in node.namespaces() {
        if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let key = match ns.name() {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        element.attrs.push((key, ns.uri().to_string()));
    }

    for attr in node.attributes() {
        element.attrs.push((
            qualified_name(node, attr.namespace(), attr.name(), true),
            attr.value().to_string(),
        ));
    }

    element.children = node.children().filter_map(convert).collect();
    element
}

/// `prefix:local` for a namespaced name, using a prefix in scope at `node`.
///
/// Elements in the default namespace stay unprefixed; attributes always
/// need a prefix.
fn qualified_name(
    node: roxmltree::Node<'_, '_>,
    namespace: Option<&str>,
    local: &str,
    attribute: bool,
) -> String {
    let Some(uri) = namespace else {
        return local.to_string();
    };
    if uri == XML_NS {
        return format!("xml:{}", local);
    }

    let mut prefix = None;
    for ns in node.namespaces().filter(|ns| ns.uri() == uri) {
        match ns.name() {
            None if !attribute => return local.to_string(),
            None => {}
            Some(name) => {
                prefix.get_or_insert(name);
            }
        }
    }

    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse(
            r#"<?xml version="1.0"?><?xml-stylesheet href="icons.css"?><svg viewBox='0 0 24 24' xmlns="http://www.w3.org/2000/svg"><g id="x"><path d="M0 0h24"/></g></svg>"#,
        )
        .unwrap();

        assert_eq!(nodes[0], Node::Instruction(r#"xml-stylesheet href="icons.css""#.to_string()));
        let Node::Element(svg) = &nodes[1] else {
            panic!("expected svg element");
        };
        assert_eq!(svg.name, "svg");
        assert_eq!(svg.attr("xmlns"), Some("http://www.w3.org/2000/svg"));
        assert_eq!(svg.attr("viewBox"), Some("0 0 24 24"));

        let g = svg.elements().next().unwrap();
        assert_eq!(g.attr("id"), Some("x"));
        assert_eq!(g.attr("xmlns"), None);
        assert_eq!(g.elements().next().unwrap().attr("d"), Some("M0 0h24"));
    }

    #[test]
    fn serializes_compactly() {
        let nodes = parse(r#"<svg><title>Close</title><path d="M1 1" /></svg>"#).unwrap();

        assert_eq!(
            to_markup(&nodes),
            r#"<svg><title>Close</title><path d="M1 1"/></svg>"#
        );
    }

    #[test]
    fn escapes_quotes_from_single_quoted_values() {
        let nodes = parse(r#"<text font-family='"Open Sans"'>A</text>"#).unwrap();

        assert_eq!(
            to_markup(&nodes),
            r#"<text font-family="&quot;Open Sans&quot;">A</text>"#
        );
    }

    #[test]
    fn expands_entities_from_the_internal_subset() {
        let nodes = parse(
            r##"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd" [
	<!ENTITY ns_svg "http://www.w3.org/2000/svg">
	<!ENTITY ns_xlink "http://www.w3.org/1999/xlink">
]>
<svg xmlns="&ns_svg;" xmlns:xlink="&ns_xlink;"><use xlink:href="#a"/></svg>"##,
        )
        .unwrap();

        let Node::Element(svg) = &nodes[0] else {
            panic!("expected svg element");
        };
        assert_eq!(svg.attr("xmlns"), Some("http://www.w3.org/2000/svg"));
        assert_eq!(svg.attr("xmlns:xlink"), Some("http://www.w3.org/1999/xlink"));

        let used = svg.elements().next().unwrap();
        assert_eq!(used.name, "use");
        assert_eq!(used.attrs, vec![("xlink:href".to_string(), "#a".to_string())]);
    }

    #[test]
    fn escapes_text_on_output() {
        let nodes = parse("<text>a &amp; b &lt; c</text>").unwrap();

        assert_eq!(nodes[0], Node::Element(Element {
            name: "text".to_string(),
            attrs: Vec::new(),
            children: vec![Node::Text("a & b < c".to_string())],
        }));
        assert_eq!(to_markup(&nodes), "<text>a &amp; b &lt; c</text>");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse("<svg><g></svg>").is_err());
        assert!(parse("<svg><g/>").is_err());
        assert!(parse("<svg>&undefined;</svg>").is_err());
    }

    #[test]
    fn walks_parents_first() {
        let nodes = parse("<svg><g><path/></g><circle/></svg>").unwrap();
        let Node::Element(svg) = &nodes[0] else {
            panic!("expected svg element");
        };

        let mut names = Vec::new();
        svg.walk(&mut |e| names.push(e.name.clone()));

        assert_eq!(names, vec!["svg", "g", "path", "circle"]);
    }
}
