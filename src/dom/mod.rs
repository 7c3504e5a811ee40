//! The document capability every component receives.
//!
//! Components never reach for a global document. They are handed an
//! `Rc<dyn Dom>` and query it with the selectors of the DOM contract, so a
//! browser binding and the in-memory [`MemoryDocument`] are interchangeable.
//!
//! All methods take `&self`: implementations use interior mutability, which
//! lets event handlers hold a clone of the `Rc` and mutate the tree without
//! threading `&mut` through closures. Execution is single-threaded, so a
//! `RefCell` is enough.

mod html;
mod memory;
mod selector;

pub use memory::MemoryDocument;
pub use selector::Selector;

use std::fmt;
use thiserror::Error;

/// Opaque handle to a node in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("unsupported selector: {0:?}")]
    UnsupportedSelector(String),
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("{0} is not an element")]
    NotAnElement(NodeId),
    #[error("HTML import error: {0}")]
    Import(String),
}

/// Layout measurements for an element, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxMetrics {
    /// Distance from the top of the document.
    pub top: f64,
    /// Rendered height (`offsetHeight`).
    pub height: f64,
    /// Full content height, including overflow (`scrollHeight`).
    pub scroll_height: f64,
}

pub trait Dom {
    fn head(&self) -> Option<NodeId>;
    fn body(&self) -> Option<NodeId>;

    /// Elements matching `selector`, in document order.
    ///
    /// With a `scope`, only descendants of that node are considered (the
    /// scope itself never matches), mirroring `Element.querySelectorAll`.
    fn query_all(&self, scope: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>, DomError>;
    fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attr(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;
    fn remove_attr(&self, node: NodeId, name: &str) -> Result<(), DomError>;

    fn text(&self, node: NodeId) -> String;
    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError>;

    /// Current value of a form control.
    fn value(&self, node: NodeId) -> String;
    fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError>;
    /// Restore every control inside `form` to its markup default.
    fn reset_form(&self, form: NodeId) -> Result<(), DomError>;

    fn style(&self, node: NodeId, property: &str) -> Option<String>;
    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<(), DomError>;

    /// Create a detached element.
    fn create_element(&self, tag: &str) -> NodeId;
    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError>;
    fn insert_after(&self, reference: NodeId, node: NodeId) -> Result<(), DomError>;
    /// Detach a node from the tree.
    fn remove(&self, node: NodeId) -> Result<(), DomError>;

    fn focus(&self, node: NodeId) -> Result<(), DomError>;
    fn focused(&self) -> Option<NodeId>;

    fn metrics(&self, node: NodeId) -> BoxMetrics;
    fn scroll_into_view(&self, node: NodeId) -> Result<(), DomError>;

    fn query(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_all(None, selector)?.into_iter().next())
    }

    fn query_in(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_all(Some(scope), selector)?.into_iter().next())
    }

    /// First match of the first selector that matches anything.
    ///
    /// Used where markup variants name the same element differently
    /// (`.hamburger` vs `#hamburgerBtn`).
    fn query_first_of(&self, selectors: &[&str]) -> Result<Option<NodeId>, DomError> {
        for selector in selectors {
            if let Some(node) = self.query(selector)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.tag_name(current).is_some() && self.matches(current, selector)? {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    fn add_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(node, class) {
            return Ok(());
        }
        let list = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &list)
    }

    fn remove_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        let Some(existing) = self.attr(node, "class") else {
            return Ok(());
        };
        let kept: Vec<&str> = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect();
        self.set_attr(node, "class", &kept.join(" "))
    }

    fn toggle_class(&self, node: NodeId, class: &str, on: bool) -> Result<(), DomError> {
        if on {
            self.add_class(node, class)
        } else {
            self.remove_class(node, class)
        }
    }

    fn is_disabled(&self, node: NodeId) -> bool {
        self.attr(node, "disabled").is_some()
    }

    fn set_disabled(&self, node: NodeId, disabled: bool) -> Result<(), DomError> {
        if disabled {
            self.set_attr(node, "disabled", "")
        } else {
            self.remove_attr(node, "disabled")
        }
    }
}
