//! In-memory native tree.
//!
//! Nodes live in a flat vector and are addressed by [`MemoryNode`]. Every
//! mutation the reconciler performs is appended to a log so tests can assert
//! on exactly what was done, not just on the resulting tree.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::{NativeHost, SVG_NAMESPACE};
use crate::error::HostError;
use crate::types::PropValue;

/// Properties that exist on every element.
const PROPERTIES: &[&str] = &["value", "checked", "id", "className", "tagName", "nodeName"];

/// Properties that exist but cannot be assigned.
const READ_ONLY: &[&str] = &["tagName", "nodeName"];

/// Built-in events, lower-cased.
const EVENTS: &[&str] = &[
    "click", "dblclick", "input", "change", "submit", "focus", "blur", "keydown", "keyup",
    "keypress", "mousedown", "mouseup", "mousemove", "mouseenter", "mouseleave", "mouseover",
    "mouseout", "scroll", "wheel", "pointerdown", "pointerup", "pointermove",
];

/// Handle to a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(u32);

impl MemoryNode {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One recorded native operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement { node: MemoryNode, tag: String },
    CreateText { node: MemoryNode, text: String },
    SetText { node: MemoryNode, text: String },
    SetAttribute { node: MemoryNode, name: String, value: String },
    RemoveAttribute { node: MemoryNode, name: String },
    SetProperty { node: MemoryNode, name: String, value: PropValue },
    SetStyleText { node: MemoryNode, css: String },
    SetStyle { node: MemoryNode, name: String, value: Option<String> },
    AddListener { node: MemoryNode, event: String, capture: bool },
    RemoveListener { node: MemoryNode, event: String, capture: bool },
    SetInnerHtml { node: MemoryNode, html: String },
    Insert { parent: MemoryNode, child: MemoryNode, before: Option<MemoryNode> },
    Remove { node: MemoryNode },
}

#[derive(Debug)]
enum Kind {
    Element { tag: String, namespace: Option<String> },
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: Kind,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    properties: HashMap<String, PropValue>,
    listeners: Vec<(String, bool)>,
    inner_html: Option<String>,
    children: Vec<MemoryNode>,
    parent: Option<MemoryNode>,
}

impl NodeData {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            style: IndexMap::new(),
            properties: HashMap::new(),
            listeners: Vec::new(),
            inner_html: None,
            children: Vec::new(),
            parent: None,
        }
    }
}

/// In-memory [`NativeHost`] with a mutation log.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<NodeData>,
    log: Vec<Mutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to render into. Not logged.
    pub fn container(&mut self) -> MemoryNode {
        self.alloc(Kind::Element {
            tag: "root".into(),
            namespace: None,
        })
    }

    /// Mutations since the last [`clear_mutations`](Self::clear_mutations).
    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    pub fn clear_mutations(&mut self) {
        self.log.clear();
    }

    /// Listeners currently subscribed on `node`.
    pub fn listeners(&self, node: MemoryNode) -> &[(String, bool)] {
        &self.nodes[node.index()].listeners
    }

    /// Current value of one style entry.
    pub fn style(&self, node: MemoryNode, name: &str) -> Option<&str> {
        self.nodes[node.index()].style.get(name).map(String::as_str)
    }

    pub fn attribute(&self, node: MemoryNode, name: &str) -> Option<&str> {
        self.nodes[node.index()].attributes.get(name).map(String::as_str)
    }

    /// Element namespace.
    pub fn namespace(&self, node: MemoryNode) -> Option<&str> {
        match &self.nodes[node.index()].kind {
            Kind::Element { namespace, .. } => namespace.as_deref(),
            Kind::Text(_) => None,
        }
    }

    /// Markup for the children of `node`.
    pub fn inner_markup(&self, node: MemoryNode) -> String {
        let mut out = String::new();
        self.write_children(node, &mut out);
        out
    }

    /// Markup for `node` itself.
    pub fn to_html(&self, node: MemoryNode) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_children(&self, node: MemoryNode, out: &mut String) {
        let data = &self.nodes[node.index()];
        if let Some(html) = &data.inner_html {
            out.push_str(html);
            return;
        }
        for child in &data.children {
            self.write_node(*child, out);
        }
    }

    fn write_node(&self, node: MemoryNode, out: &mut String) {
        let data = &self.nodes[node.index()];
        match &data.kind {
            Kind::Text(text) => out.push_str(text),
            Kind::Element { tag, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &data.attributes {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                if !data.style.is_empty() {
                    let css: Vec<String> = data
                        .style
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", css.join("; "));
                }
                out.push('>');
                self.write_children(node, out);
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn alloc(&mut self, kind: Kind) -> MemoryNode {
        let node = MemoryNode(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind));
        node
    }

    fn data_mut(&mut self, node: &MemoryNode) -> &mut NodeData {
        &mut self.nodes[node.index()]
    }

    fn detach(&mut self, node: MemoryNode) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != node);
        }
    }
}

impl NativeHost for MemoryHost {
    type Node = MemoryNode;

    fn create_element(&mut self, tag: &str, namespace: Option<&str>, is: Option<&str>) -> MemoryNode {
        let node = self.alloc(Kind::Element {
            tag: tag.to_string(),
            namespace: namespace.map(str::to_string),
        });
        if let Some(is) = is {
            self.data_mut(&node).attributes.insert("is".into(), is.into());
        }
        self.log.push(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text(&mut self, text: &str) -> MemoryNode {
        let node = self.alloc(Kind::Text(text.to_string()));
        self.log.push(Mutation::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn is_text(&self, node: &MemoryNode) -> bool {
        matches!(self.nodes[node.index()].kind, Kind::Text(_))
    }

    fn local_name(&self, node: &MemoryNode) -> Option<String> {
        match &self.nodes[node.index()].kind {
            Kind::Element { tag, .. } => Some(tag.clone()),
            Kind::Text(_) => None,
        }
    }

    fn text(&self, node: &MemoryNode) -> Option<String> {
        match &self.nodes[node.index()].kind {
            Kind::Text(text) => Some(text.clone()),
            Kind::Element { .. } => None,
        }
    }

    fn attributes(&self, node: &MemoryNode) -> Vec<(String, String)> {
        self.nodes[node.index()]
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn has_property(&self, node: &MemoryNode, name: &str) -> bool {
        !self.is_text(node) && PROPERTIES.contains(&name)
    }

    fn property(&self, node: &MemoryNode, name: &str) -> Option<PropValue> {
        let data = &self.nodes[node.index()];
        match name {
            "id" => data.attributes.get("id").map(|v| PropValue::from(v.as_str())),
            "className" => data.attributes.get("class").map(|v| PropValue::from(v.as_str())),
            "tagName" | "nodeName" => match &data.kind {
                Kind::Element { tag, namespace } if namespace.as_deref() == Some(SVG_NAMESPACE) => {
                    Some(PropValue::from(tag.as_str()))
                }
                Kind::Element { tag, .. } => Some(PropValue::from(tag.to_uppercase())),
                Kind::Text(_) => Some(PropValue::from("#text")),
            },
            _ => data.properties.get(name).cloned(),
        }
    }

    fn is_builtin_event(&self, _node: &MemoryNode, event: &str) -> bool {
        EVENTS.contains(&event)
    }

    fn inner_html(&self, node: &MemoryNode) -> String {
        self.inner_markup(*node)
    }

    fn child_nodes(&self, node: &MemoryNode) -> Vec<MemoryNode> {
        self.nodes[node.index()].children.clone()
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        self.nodes[node.index()].parent
    }

    fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let parent = self.nodes[node.index()].parent?;
        let siblings = &self.nodes[parent.index()].children;
        let position = siblings.iter().position(|c| c == node)?;
        siblings.get(position + 1).copied()
    }

    fn set_text(&mut self, node: &MemoryNode, text: &str) {
        if let Kind::Text(content) = &mut self.data_mut(node).kind {
            *content = text.to_string();
        }
        self.log.push(Mutation::SetText {
            node: *node,
            text: text.to_string(),
        });
    }

    fn set_attribute(&mut self, node: &MemoryNode, name: &str, value: &str) {
        self.data_mut(node)
            .attributes
            .insert(name.to_string(), value.to_string());
        self.log.push(Mutation::SetAttribute {
            node: *node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: &MemoryNode, name: &str) {
        self.data_mut(node).attributes.shift_remove(name);
        self.log.push(Mutation::RemoveAttribute {
            node: *node,
            name: name.to_string(),
        });
    }

    fn set_property(&mut self, node: &MemoryNode, name: &str, value: &PropValue) -> Result<(), HostError> {
        if READ_ONLY.contains(&name) {
            return Err(HostError::ReadOnly {
                name: name.to_string(),
            });
        }

        let data = self.data_mut(node);
        match name {
            // Reflected properties.
            "id" | "className" => {
                let attribute = if name == "id" { "id" } else { "class" };
                match value.to_attribute() {
                    Some(text) if !text.is_empty() => {
                        data.attributes.insert(attribute.to_string(), text);
                    }
                    _ => {
                        data.attributes.shift_remove(attribute);
                    }
                }
            }
            "checked" => {
                data.properties
                    .insert(name.to_string(), PropValue::Bool(!value.is_falsy()));
            }
            "value" if value.is_function() => {
                return Err(HostError::Rejected {
                    name: name.to_string(),
                    reason: "expected a scalar".into(),
                });
            }
            _ => {
                data.properties.insert(name.to_string(), value.clone());
            }
        }

        self.log.push(Mutation::SetProperty {
            node: *node,
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn set_style_text(&mut self, node: &MemoryNode, css: &str) {
        let style = &mut self.data_mut(node).style;
        style.clear();
        for declaration in css.split(';') {
            if let Some((name, value)) = declaration.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    style.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
        self.log.push(Mutation::SetStyleText {
            node: *node,
            css: css.to_string(),
        });
    }

    fn set_style(&mut self, node: &MemoryNode, name: &str, value: Option<&str>) {
        let style = &mut self.data_mut(node).style;
        match value {
            Some(value) if !value.is_empty() => {
                style.insert(name.to_string(), value.to_string());
            }
            _ => {
                style.shift_remove(name);
            }
        }
        self.log.push(Mutation::SetStyle {
            node: *node,
            name: name.to_string(),
            value: value.map(str::to_string),
        });
    }

    fn add_listener(&mut self, node: &MemoryNode, event: &str, capture: bool) {
        self.data_mut(node).listeners.push((event.to_string(), capture));
        self.log.push(Mutation::AddListener {
            node: *node,
            event: event.to_string(),
            capture,
        });
    }

    fn remove_listener(&mut self, node: &MemoryNode, event: &str, capture: bool) {
        self.data_mut(node)
            .listeners
            .retain(|(e, c)| !(e == event && *c == capture));
        self.log.push(Mutation::RemoveListener {
            node: *node,
            event: event.to_string(),
            capture,
        });
    }

    fn set_inner_html(&mut self, node: &MemoryNode, html: &str) {
        let children = std::mem::take(&mut self.data_mut(node).children);
        for child in children {
            self.nodes[child.index()].parent = None;
        }
        self.data_mut(node).inner_html = (!html.is_empty()).then(|| html.to_string());
        self.log.push(Mutation::SetInnerHtml {
            node: *node,
            html: html.to_string(),
        });
    }

    fn insert_before(&mut self, parent: &MemoryNode, child: &MemoryNode, before: Option<&MemoryNode>) {
        self.detach(*child);

        let data = self.data_mut(parent);
        data.inner_html = None;
        let position = before
            .and_then(|b| data.children.iter().position(|c| c == b))
            .unwrap_or(data.children.len());
        data.children.insert(position, *child);
        self.nodes[child.index()].parent = Some(*parent);

        self.log.push(Mutation::Insert {
            parent: *parent,
            child: *child,
            before: before.copied(),
        });
    }

    fn remove(&mut self, node: &MemoryNode) {
        if self.nodes[node.index()].parent.is_none() {
            return;
        }
        self.detach(*node);
        self.log.push(Mutation::Remove { node: *node });
    }
}
