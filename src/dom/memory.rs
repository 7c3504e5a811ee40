//! Arena-backed in-memory document.
//!
//! Nodes live in a `Vec` and are addressed by index; detaching a node only
//! unlinks it from its parent, so a [`NodeId`] stays valid for the lifetime
//! of the document. Layout is not computed: tests and the CLI assign
//! [`BoxMetrics`] explicitly with [`MemoryDocument::set_metrics`].

use super::selector::{Matchable, Selector};
use super::{BoxMetrics, Dom, DomError, NodeId};
use std::cell::RefCell;

#[derive(Debug, Clone)]
pub(super) struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub styles: Vec<(String, String)>,
    /// Live control value; `None` means "markup default".
    pub value: Option<String>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            styles: Vec::new(),
            value: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn style_attr(&self) -> Option<String> {
        if self.styles.is_empty() {
            return None;
        }
        let decls: Vec<String> = self
            .styles
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        Some(format!("{};", decls.join("; ")))
    }

    pub fn set_style(&mut self, property: &str, value: &str) {
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            self.styles.retain(|(k, _)| *k != property);
            return;
        }
        match self.styles.iter_mut().find(|(k, _)| *k == property) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.styles.push((property, value.to_string())),
        }
    }

    pub fn set_style_attr(&mut self, declarations: &str) {
        self.styles.clear();
        for decl in declarations.split(';') {
            if let Some((k, v)) = decl.split_once(':') {
                self.set_style(k, v);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(super) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(super) struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub metrics: BoxMetrics,
}

#[derive(Debug, Clone)]
pub(super) struct Tree {
    pub nodes: Vec<Node>,
    pub root: NodeId,
    focused: Option<NodeId>,
    scrolled_into_view: Vec<NodeId>,
}

impl Tree {
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
                metrics: BoxMetrics::default(),
            }],
            root: NodeId(0),
            focused: None,
            scrolled_into_view: Vec::new(),
        }
    }

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
            metrics: BoxMetrics::default(),
        });
        id
    }

    fn check(&self, node: NodeId) -> Result<(), DomError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Result<&mut ElementData, DomError> {
        self.check(node)?;
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if matches!(self.nodes[parent.0].kind, NodeKind::Text(_)) {
            return Err(DomError::NotAnElement(parent));
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn child_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.element(*c).is_some_and(|el| el.tag == tag))
    }

    /// Element descendants of `scope` in document order, excluding `scope`.
    pub fn descendant_elements(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.element(node).is_some() {
                out.push(node);
            }
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &self.nodes[node.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    fn default_value(&self, node: NodeId) -> String {
        let Some(el) = self.element(node) else {
            return String::new();
        };
        match el.tag.as_str() {
            "textarea" => self.text_content(node),
            "select" => {
                let options: Vec<NodeId> = self
                    .descendant_elements(node)
                    .into_iter()
                    .filter(|o| self.element(*o).is_some_and(|e| e.tag == "option"))
                    .collect();
                let chosen = options
                    .iter()
                    .copied()
                    .find(|o| self.element(*o).is_some_and(|e| e.get("selected").is_some()))
                    .or_else(|| options.first().copied());
                chosen
                    .map(|o| self.option_value(o))
                    .unwrap_or_default()
            }
            _ => el.get("value").unwrap_or_default().to_string(),
        }
    }

    pub fn option_value(&self, option: NodeId) -> String {
        match self.element(option).and_then(|e| e.get("value")) {
            Some(v) => v.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }
}

impl Matchable for Tree {
    fn tag_of(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    fn attr_of(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|el| el.get(name))
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .get(node.0)?
            .parent
            .filter(|p| self.element(*p).is_some())
    }
}

/// A document held entirely in memory.
#[derive(Debug)]
pub struct MemoryDocument {
    pub(super) tree: RefCell<Tree>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut tree = Tree::empty();
        let html = tree.create(NodeKind::Element(ElementData::new("html")));
        let head = tree.create(NodeKind::Element(ElementData::new("head")));
        let body = tree.create(NodeKind::Element(ElementData::new("body")));
        let root = tree.root;
        // Fresh ids in a fresh tree cannot fail to link.
        let _ = tree.append(root, html);
        let _ = tree.append(html, head);
        let _ = tree.append(html, body);
        Self {
            tree: RefCell::new(tree),
        }
    }

    /// Append a new element with attributes under `parent`.
    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let mut data = ElementData::new(tag);
        for (k, v) in attrs {
            if k.eq_ignore_ascii_case("style") {
                data.set_style_attr(v);
            } else {
                data.set(&k.to_ascii_lowercase(), v);
            }
        }
        let mut tree = self.tree.borrow_mut();
        let node = tree.create(NodeKind::Element(data));
        tree.append(parent, node)?;
        Ok(node)
    }

    /// Append a text node under `parent`.
    pub fn append_text(&self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let mut tree = self.tree.borrow_mut();
        let node = tree.create(NodeKind::Text(text.to_string()));
        tree.append(parent, node)?;
        Ok(node)
    }

    pub fn set_metrics(&self, node: NodeId, metrics: BoxMetrics) {
        if let Some(slot) = self.tree.borrow_mut().nodes.get_mut(node.0) {
            slot.metrics = metrics;
        }
    }

    /// Nodes passed to [`Dom::scroll_into_view`], oldest first.
    pub fn scrolled_into_view(&self) -> Vec<NodeId> {
        self.tree.borrow().scrolled_into_view.clone()
    }

    /// Whether `node` is still attached to the document.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let tree = self.tree.borrow();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == tree.root {
                return true;
            }
            cursor = tree.nodes.get(current.0).and_then(|n| n.parent);
        }
        false
    }
}

impl Dom for MemoryDocument {
    fn head(&self) -> Option<NodeId> {
        let tree = self.tree.borrow();
        let html = tree.child_element(tree.root, "html")?;
        tree.child_element(html, "head")
    }

    fn body(&self) -> Option<NodeId> {
        let tree = self.tree.borrow();
        let html = tree.child_element(tree.root, "html")?;
        tree.child_element(html, "body")
    }

    fn query_all(&self, scope: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        let tree = self.tree.borrow();
        let scope = scope.unwrap_or(tree.root);
        tree.check(scope)?;
        Ok(tree
            .descendant_elements(scope)
            .into_iter()
            .filter(|node| selector.matches(&*tree, *node))
            .collect())
    }

    fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let selector = Selector::parse(selector)?;
        let tree = self.tree.borrow();
        Ok(selector.matches(&*tree, node))
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().nodes.get(node.0)?.parent
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.tree.borrow().element(node).map(|el| el.tag.clone())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.tree.borrow();
        let el = tree.element(node)?;
        if name == "style" {
            return el.style_attr();
        }
        el.get(name).map(str::to_string)
    }

    fn set_attr(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        let el = tree.element_mut(node)?;
        let name = name.to_ascii_lowercase();
        if name == "style" {
            el.set_style_attr(value);
        } else {
            el.set(&name, value);
        }
        Ok(())
    }

    fn remove_attr(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        let el = tree.element_mut(node)?;
        if name == "style" {
            el.styles.clear();
        } else {
            el.attrs.retain(|(k, _)| k != name);
        }
        Ok(())
    }

    fn text(&self, node: NodeId) -> String {
        let tree = self.tree.borrow();
        if tree.check(node).is_err() {
            return String::new();
        }
        tree.text_content(node)
    }

    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        tree.element_mut(node)?;
        let children = std::mem::take(&mut tree.nodes[node.0].children);
        for child in children {
            tree.nodes[child.0].parent = None;
        }
        let text_node = tree.create(NodeKind::Text(text.to_string()));
        tree.append(node, text_node)
    }

    fn value(&self, node: NodeId) -> String {
        let tree = self.tree.borrow();
        match tree.element(node) {
            Some(el) => match &el.value {
                Some(v) => v.clone(),
                None => tree.default_value(node),
            },
            None => String::new(),
        }
    }

    fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.tree.borrow_mut().element_mut(node)?.value = Some(value.to_string());
        Ok(())
    }

    fn reset_form(&self, form: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        tree.check(form)?;
        for node in tree.descendant_elements(form) {
            let el = tree.element_mut(node)?;
            if matches!(el.tag.as_str(), "input" | "textarea" | "select") {
                el.value = None;
            }
        }
        Ok(())
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        let tree = self.tree.borrow();
        tree.element(node)?
            .styles
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.clone())
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.tree
            .borrow_mut()
            .element_mut(node)?
            .set_style(property, value);
        Ok(())
    }

    fn create_element(&self, tag: &str) -> NodeId {
        self.tree
            .borrow_mut()
            .create(NodeKind::Element(ElementData::new(tag)))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree.borrow_mut().append(parent, child)
    }

    fn insert_after(&self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        tree.check(reference)?;
        tree.check(node)?;
        let parent = tree.nodes[reference.0]
            .parent
            .ok_or(DomError::UnknownNode(reference))?;
        tree.detach(node);
        let siblings = &mut tree.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|c| *c == reference)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, node);
        tree.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        tree.check(node)?;
        tree.detach(node);
        Ok(())
    }

    fn focus(&self, node: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        tree.element_mut(node)?;
        tree.focused = Some(node);
        Ok(())
    }

    fn focused(&self) -> Option<NodeId> {
        self.tree.borrow().focused
    }

    fn metrics(&self, node: NodeId) -> BoxMetrics {
        self.tree
            .borrow()
            .nodes
            .get(node.0)
            .map(|n| n.metrics)
            .unwrap_or_default()
    }

    fn scroll_into_view(&self, node: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        tree.check(node)?;
        tree.scrolled_into_view.push(node);
        Ok(())
    }
}
