//! Host document abstraction.
//!
//! The reconciler only ever talks to the host tree through [`Document`];
//! [`MemoryDocument`] is the arena-backed implementation used by tests, the
//! demo binary, and any embedding that wants to snapshot output as HTML.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::collections::map::HashMap;
use crate::Handler;

pub type NodeId = usize;

/// Primitives the host tree must supply.
///
/// `insert_before` with `before = None` appends. Implementations take `&self`;
/// the reconciler re-enters the document from scheduled updates, so interior
/// mutability is part of the contract.
pub trait Document {
    fn create_element(&self, tag: &str) -> NodeId;
    fn create_text(&self, text: &str) -> NodeId;
    /// A comment-like node used purely as an ordering anchor.
    fn create_marker(&self, label: &str) -> NodeId;
    fn insert_before(&self, parent: NodeId, node: NodeId, before: Option<NodeId>);
    fn remove_child(&self, parent: NodeId, node: NodeId);
    /// Needed to capture the host-node range belonging to a keyed list item.
    fn next_sibling(&self, parent: NodeId, node: NodeId) -> Option<NodeId>;
    fn set_attribute(&self, element: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, element: NodeId, name: &str);
    /// Install a function-valued property under `name` (already lower-cased).
    fn set_handler(&self, element: NodeId, name: &str, handler: Handler);
    fn remove_handler(&self, element: NodeId, name: &str);
    fn clear_children(&self, node: NodeId);
}

enum MemoryNode {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        handlers: HashMap<String, Handler>,
        children: Vec<NodeId>,
    },
    Text {
        text: String,
    },
    Marker {
        label: String,
    },
}

struct Entry {
    parent: Option<NodeId>,
    node: MemoryNode,
}

/// In-memory host tree: an arena of optional entries, ids are never reused.
#[derive(Default)]
pub struct MemoryDocument {
    entries: RefCell<Vec<Option<Entry>>>,
    elements_created: Cell<usize>,
    texts_created: Cell<usize>,
    markers_created: Cell<usize>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, node: MemoryNode) -> NodeId {
        let mut entries = self.entries.borrow_mut();
        let id = entries.len();
        entries.push(Some(Entry { parent: None, node }));
        id
    }

    fn with_entry<R>(&self, id: NodeId, f: impl FnOnce(&mut Entry) -> R) -> R {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(id)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("node {id} is not alive"));
        f(entry)
    }

    fn detach(&self, parent: NodeId, node: NodeId) {
        self.with_entry(parent, |entry| match &mut entry.node {
            MemoryNode::Element { children, .. } => {
                children.retain(|child| *child != node);
            }
            _ => panic!("node {parent} cannot hold children"),
        });
        self.with_entry(node, |entry| entry.parent = None);
    }

    fn drop_subtree(&self, node: NodeId) {
        let children = {
            let mut entries = self.entries.borrow_mut();
            let slot = entries
                .get_mut(node)
                .unwrap_or_else(|| panic!("node {node} is not alive"));
            match slot.take() {
                Some(Entry {
                    node: MemoryNode::Element { children, .. },
                    ..
                }) => children,
                Some(_) => Vec::new(),
                None => panic!("node {node} is not alive"),
            }
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    /// Number of live nodes in the arena.
    pub fn live_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.is_some())
            .count()
    }

    pub fn elements_created(&self) -> usize {
        self.elements_created.get()
    }

    pub fn texts_created(&self) -> usize {
        self.texts_created.get()
    }

    pub fn markers_created(&self) -> usize {
        self.markers_created.get()
    }

    pub fn tag_of(&self, id: NodeId) -> String {
        self.with_entry(id, |entry| match &entry.node {
            MemoryNode::Element { tag, .. } => tag.clone(),
            _ => panic!("node {id} is not an element"),
        })
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.with_entry(id, |entry| match &entry.node {
            MemoryNode::Element { attrs, .. } => attrs.get(name).cloned(),
            _ => panic!("node {id} is not an element"),
        })
    }

    pub fn text_of(&self, id: NodeId) -> String {
        self.with_entry(id, |entry| match &entry.node {
            MemoryNode::Text { text } => text.clone(),
            _ => panic!("node {id} is not a text node"),
        })
    }

    /// Depth-first search for the first element with `tag` under `root`.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        let children = self.with_entry(root, |entry| match &entry.node {
            MemoryNode::Element {
                tag: node_tag,
                children,
                ..
            } => {
                if node_tag == tag {
                    None
                } else {
                    Some(children.clone())
                }
            }
            _ => Some(Vec::new()),
        });
        let children = match children {
            None => return Some(root),
            Some(children) => children,
        };
        children
            .into_iter()
            .find_map(|child| self.find_by_tag(child, tag))
    }

    /// Invoke the handler installed under `name`, if any. Returns whether one
    /// ran. The handler is cloned out before the call so it may freely mutate
    /// the document.
    pub fn dispatch(&self, element: NodeId, name: &str) -> bool {
        let handler = self.with_entry(element, |entry| match &entry.node {
            MemoryNode::Element { handlers, .. } => handlers.get(name).cloned(),
            _ => panic!("node {element} is not an element"),
        });
        match handler {
            Some(handler) => {
                handler.call();
                true
            }
            None => false,
        }
    }

    /// Serialize the node itself.
    pub fn html_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id);
        out
    }

    /// Serialize the node's children, the shape tests assert against.
    pub fn inner_html(&self, id: NodeId) -> String {
        let children = self.with_entry(id, |entry| match &entry.node {
            MemoryNode::Element { children, .. } => children.clone(),
            _ => panic!("node {id} is not an element"),
        });
        let mut out = String::new();
        for child in children {
            self.write_node(&mut out, child);
        }
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        enum Piece {
            Element(String, Vec<(String, String)>, Vec<NodeId>),
            Text(String),
            Marker(String),
        }
        let piece = self.with_entry(id, |entry| match &entry.node {
            MemoryNode::Element {
                tag,
                attrs,
                children,
                ..
            } => Piece::Element(
                tag.clone(),
                attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                children.clone(),
            ),
            MemoryNode::Text { text } => Piece::Text(text.clone()),
            MemoryNode::Marker { label } => Piece::Marker(label.clone()),
        });
        match piece {
            Piece::Element(tag, attrs, children) => {
                let _ = write!(out, "<{tag}");
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(&value));
                }
                out.push('>');
                for child in children {
                    self.write_node(out, child);
                }
                let _ = write!(out, "</{tag}>");
            }
            Piece::Text(text) => out.push_str(&escape_text(&text)),
            Piece::Marker(label) => {
                let _ = write!(out, "<!--{label}-->");
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

impl Document for MemoryDocument {
    fn create_element(&self, tag: &str) -> NodeId {
        self.elements_created.set(self.elements_created.get() + 1);
        self.push(MemoryNode::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            handlers: HashMap::new(),
            children: Vec::new(),
        })
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.texts_created.set(self.texts_created.get() + 1);
        self.push(MemoryNode::Text {
            text: text.to_string(),
        })
    }

    fn create_marker(&self, label: &str) -> NodeId {
        self.markers_created.set(self.markers_created.get() + 1);
        self.push(MemoryNode::Marker {
            label: label.to_string(),
        })
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        // Moving an attached node re-parents it, like DOM insertBefore.
        let old_parent = self.with_entry(node, |entry| entry.parent);
        if let Some(old_parent) = old_parent {
            self.detach(old_parent, node);
        }
        self.with_entry(parent, |entry| match &mut entry.node {
            MemoryNode::Element { children, .. } => match before {
                Some(reference) => {
                    let index = children
                        .iter()
                        .position(|child| *child == reference)
                        .unwrap_or_else(|| panic!("node {reference} is not a child of {parent}"));
                    children.insert(index, node);
                }
                None => children.push(node),
            },
            _ => panic!("node {parent} cannot hold children"),
        });
        self.with_entry(node, |entry| entry.parent = Some(parent));
    }

    fn remove_child(&self, parent: NodeId, node: NodeId) {
        self.detach(parent, node);
        self.drop_subtree(node);
    }

    fn next_sibling(&self, parent: NodeId, node: NodeId) -> Option<NodeId> {
        self.with_entry(parent, |entry| match &entry.node {
            MemoryNode::Element { children, .. } => {
                let index = children.iter().position(|child| *child == node)?;
                children.get(index + 1).copied()
            }
            _ => panic!("node {parent} cannot hold children"),
        })
    }

    fn set_attribute(&self, element: NodeId, name: &str, value: &str) {
        self.with_entry(element, |entry| match &mut entry.node {
            MemoryNode::Element { attrs, .. } => {
                attrs.insert(name.to_string(), value.to_string());
            }
            _ => panic!("node {element} is not an element"),
        });
    }

    fn remove_attribute(&self, element: NodeId, name: &str) {
        self.with_entry(element, |entry| match &mut entry.node {
            MemoryNode::Element { attrs, .. } => {
                attrs.shift_remove(name);
            }
            _ => panic!("node {element} is not an element"),
        });
    }

    fn set_handler(&self, element: NodeId, name: &str, handler: Handler) {
        self.with_entry(element, |entry| match &mut entry.node {
            MemoryNode::Element { handlers, .. } => {
                handlers.insert(name.to_string(), handler);
            }
            _ => panic!("node {element} is not an element"),
        });
    }

    fn remove_handler(&self, element: NodeId, name: &str) {
        self.with_entry(element, |entry| match &mut entry.node {
            MemoryNode::Element { handlers, .. } => {
                handlers.remove(name);
            }
            _ => panic!("node {element} is not an element"),
        });
    }

    fn clear_children(&self, node: NodeId) {
        let children = self.with_entry(node, |entry| match &mut entry.node {
            MemoryNode::Element { children, .. } => std::mem::take(children),
            _ => panic!("node {node} cannot hold children"),
        });
        for child in children {
            self.with_entry(child, |entry| entry.parent = None);
            self.drop_subtree(child);
        }
    }
}

#[cfg(test)]
#[path = "tests/dom_tests.rs"]
mod tests;
