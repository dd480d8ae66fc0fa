//! HTML fragment parsing
//!
//! Composed markup is parsed with html5ever in a `<body>` fragment context,
//! so sloppy hand-authored markup is recovered the way a browser would:
//! unknown close tags are dropped, unclosed elements are closed, stray `<`
//! characters stay text and entities are decoded. Tag and attribute names
//! come back lowercased.

use crate::ast::HtmlNode;
use html5ever::tendril::TendrilSink;
use html5ever::{parse_fragment, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that never have children
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse an HTML fragment into nodes
pub fn parse_html(source: &str) -> Vec<HtmlNode> {
    let context = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body"));
    let dom = parse_fragment(RcDom::default(), Default::default(), context, Vec::new()).one(source);

    // The fragment lands under a synthetic <html> root
    let document = dom.document;
    let roots = document.children.borrow();
    let mut nodes = Vec::new();
    for root in roots.iter() {
        match &root.data {
            NodeData::Element { name, .. } if &*name.local == "html" => {
                collect_children(root, &mut nodes);
            }
            _ => collect_node(root, &mut nodes),
        }
    }
    nodes
}

fn collect_children(handle: &Handle, out: &mut Vec<HtmlNode>) {
    for child in handle.children.borrow().iter() {
        collect_node(child, out);
    }
}

fn collect_node(handle: &Handle, out: &mut Vec<HtmlNode>) {
    match &handle.data {
        NodeData::Text { contents } => {
            let content = contents.borrow().to_string();
            // html5ever merges adjacent text, except across dropped tags
            if let Some(HtmlNode::Text { content: previous }) = out.last_mut() {
                previous.push_str(&content);
            } else {
                out.push(HtmlNode::Text { content });
            }
        }
        NodeData::Comment { contents } => out.push(HtmlNode::Comment {
            content: contents.to_string(),
        }),
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attributes = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();

            let mut children = Vec::new();
            match template_contents.borrow().as_ref() {
                Some(contents) => collect_children(contents, &mut children),
                None => collect_children(handle, &mut children),
            }

            out.push(HtmlNode::Element {
                tag: name.local.to_string(),
                attributes,
                children,
            });
        }
        NodeData::Document => collect_children(handle, out),
        NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &HtmlNode) -> (&str, &[(String, String)], &[HtmlNode]) {
        match node {
            HtmlNode::Element {
                tag,
                attributes,
                children,
            } => (tag.as_str(), attributes.as_slice(), children.as_slice()),
            other => panic!("Expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let nodes = parse_html(r#"<div class="card" data-bind-class="cls"><p>Hi <b>there</b></p></div>"#);
        assert_eq!(nodes.len(), 1);

        let (tag, attrs, children) = element(&nodes[0]);
        assert_eq!(tag, "div");
        assert_eq!(attrs[0], ("class".to_string(), "card".to_string()));
        assert_eq!(attrs[1], ("data-bind-class".to_string(), "cls".to_string()));

        let (p, _, p_children) = element(&children[0]);
        assert_eq!(p, "p");
        assert_eq!(p_children[0], HtmlNode::text("Hi "));
    }

    #[test]
    fn test_names_are_lowercased() {
        let nodes = parse_html(r#"<DIV data-bind-innerHTML="content"></DIV>"#);
        let (tag, attrs, _) = element(&nodes[0]);
        assert_eq!(tag, "div");
        assert_eq!(attrs[0].0, "data-bind-innerhtml");
    }

    #[test]
    fn test_void_elements() {
        let nodes = parse_html("<input disabled value=x><br/>after");
        assert_eq!(nodes.len(), 3);
        let (_, attrs, children) = element(&nodes[0]);
        assert!(children.is_empty());
        assert_eq!(attrs[0], ("disabled".to_string(), String::new()));
        assert_eq!(attrs[1], ("value".to_string(), "x".to_string()));
        assert_eq!(nodes[2], HtmlNode::text("after"));
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let nodes = parse_html("<div><span>a</div></em>b");
        assert_eq!(nodes.len(), 2);
        let (_, _, children) = element(&nodes[0]);
        let (span, _, _) = element(&children[0]);
        assert_eq!(span, "span");
        assert_eq!(nodes[1], HtmlNode::text("b"));
    }

    #[test]
    fn test_style_content_is_raw() {
        let nodes = parse_html("<style>.a > .b { color: red; }</style><p>1 &lt; 2</p>");
        let (_, _, style_children) = element(&nodes[0]);
        assert_eq!(style_children[0], HtmlNode::text(".a > .b { color: red; }"));
        let (_, _, p_children) = element(&nodes[1]);
        assert_eq!(p_children[0], HtmlNode::text("1 < 2"));
    }

    #[test]
    fn test_comments_and_stray_angle_bracket() {
        let nodes = parse_html("a < b<!-- note -->c");
        assert_eq!(nodes[0], HtmlNode::text("a < b"));
        assert_eq!(
            nodes[1],
            HtmlNode::Comment {
                content: " note ".to_string()
            }
        );
        assert_eq!(nodes[2], HtmlNode::text("c"));
    }

    #[test]
    fn test_template_syntax_survives() {
        let nodes = parse_html(r#"<button data-event-click="select(item.id)">{{ label }}</button>"#);
        let (_, attrs, children) = element(&nodes[0]);
        assert_eq!(attrs[0].1, "select(item.id)");
        assert_eq!(children[0], HtmlNode::text("{{ label }}"));
    }

    #[test]
    fn test_entities_are_decoded() {
        let nodes = parse_html(r#"<a title="x &amp; y">&#65;&#x42; &amp;</a>"#);
        let (_, attrs, children) = element(&nodes[0]);
        assert_eq!(attrs[0].1, "x & y");
        assert_eq!(children[0], HtmlNode::text("AB &"));
    }
}
