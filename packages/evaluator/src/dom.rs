//! # Arena DOM
//!
//! The live tree rendered views are mounted into. Nodes live in one arena
//! and are addressed by `NodeId`; detached nodes stay in the arena until the
//! document is dropped, so stale ids never dangle.
//!
//! Elements also carry what the runtime needs on top of plain HTML:
//! listeners attached by event bindings, and the original values of
//! attributes that bindings overwrite.

use std::collections::HashMap;
use tessera_parser::{is_void_element, HtmlNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Event listener attached by an event binding
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub event: String,
    /// Handler expression as authored
    pub handler: String,
    /// Instance whose context runs the handler
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub listeners: Vec<Listener>,
    /// Attribute values as they were before a binding first touched them
    pub originals: HashMap<String, Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub content: String,
    /// Interpolation source, kept so the text can be recomputed
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(ElementData),
    Text(TextData),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            body: NodeId(0),
        };
        document.body = document.create_element("body");
        document
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.into(),
            attributes: Vec::new(),
            listeners: Vec::new(),
            originals: HashMap::new(),
        }))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(TextData {
            content: content.into(),
            template: None,
        }))
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(content.into()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    pub fn remove_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Build parsed markup under `parent`, returning the new top-level nodes
    pub fn mount(&mut self, parent: NodeId, nodes: &[HtmlNode]) -> Vec<NodeId> {
        nodes
            .iter()
            .map(|node| {
                let id = self.build(node);
                self.append_child(parent, id);
                id
            })
            .collect()
    }

    fn build(&mut self, node: &HtmlNode) -> NodeId {
        match node {
            HtmlNode::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element(tag.as_str());
                if let Some(element) = self.element_mut(id) {
                    element.attributes = attributes.clone();
                }
                for child in children {
                    let child_id = self.build(child);
                    self.append_child(id, child_id);
                }
                id
            }
            HtmlNode::Text { content } => self.create_text(content.as_str()),
            HtmlNode::Comment { content } => self.create_comment(content.as_str()),
        }
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.0)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&TextData> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, node: NodeId) -> Option<&mut TextData> {
        match &mut self.nodes.get_mut(node.0)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `node` is still reachable from `ancestor`
    pub fn is_inside(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(element) = self.element_mut(node) {
            match element.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value,
                None => element.attributes.push((name.to_string(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.retain(|(key, _)| key != name);
        }
    }

    /// Attribute value before any binding changed it
    ///
    /// The first call records the current value.
    pub fn original_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        let current = self.attr(node, name).map(str::to_string);
        let element = self.element_mut(node)?;
        element
            .originals
            .entry(name.to_string())
            .or_insert(current)
            .clone()
    }

    pub fn add_listener(&mut self, node: NodeId, listener: Listener) {
        if let Some(element) = self.element_mut(node) {
            let exists = element.listeners.iter().any(|l| {
                l.event == listener.event
                    && l.handler == listener.handler
                    && l.instance_id == listener.instance_id
            });
            if !exists {
                element.listeners.push(listener);
            }
        }
    }

    pub fn listeners(&self, node: NodeId) -> &[Listener] {
        self.element(node)
            .map(|e| e.listeners.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes under `root` in document order, `root` included
    ///
    /// Children of a node rejected by `descend` are not visited, the node
    /// itself still is.
    pub fn descendants_filtered<F>(&self, root: NodeId, descend: F) -> Vec<NodeId>
    where
        F: Fn(NodeId) -> bool,
    {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            if node == root || descend(node) {
                for child in self.children(node).iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants_filtered(root, |_| true)
    }

    /// Elements under `root` carrying `name`, in document order
    pub fn find_by_attr(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| self.attr(*node, name).is_some())
            .collect()
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let Some(text) = self.text(id) {
                out.push_str(&text.content);
            }
        }
        out
    }

    /// Replace the children of `node` with one text node
    pub fn set_text_content(&mut self, node: NodeId, content: impl Into<String>) {
        self.remove_children(node);
        let text = self.create_text(content);
        self.append_child(node, text);
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (key, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&element.tag) {
                    return;
                }
                let raw = matches!(element.tag.as_str(), "script" | "style");
                for child in self.children(node) {
                    match self.data(*child) {
                        NodeData::Text(text) if raw => out.push_str(&text.content),
                        _ => self.write_html(*child, out),
                    }
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
            NodeData::Text(text) => out.push_str(&escape_text(&text.content)),
            NodeData::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
        }
    }
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
