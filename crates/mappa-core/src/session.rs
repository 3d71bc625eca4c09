//! Per-user navigation state.
//!
//! A [`Session`] is a plain value: every transition consumes it and returns
//! the next one, so a shell can thread it through a request and hand the
//! result back to the client.

use serde::{Deserialize, Serialize};

use crate::model::{ConceptNode, NodeKind};
use crate::navigator::{breadcrumb, display_title, is_leaf, resolve};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub current_path: Vec<String>,
    pub show_search: bool,
    pub show_ask: bool,
    /// The current leaf's message has already been relayed.
    pub message_sent: bool,
}

/// What the shell should render for the current path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub title: Option<String>,
    pub description: Option<String>,
    pub breadcrumb: String,
    pub body: ViewBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewBody {
    Leaf { message: String },
    Category { entries: Vec<ChildEntry> },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildEntry {
    pub key: String,
    pub title: String,
    pub is_leaf: bool,
}

/// Result of rendering a session against the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewed {
    pub session: Session,
    pub view: NodeView,
    /// The stored path no longer resolved and the session was reset to the root.
    pub recovered: bool,
}

impl Session {
    pub fn at(path: Vec<String>) -> Self {
        Self {
            current_path: path,
            ..Default::default()
        }
    }

    pub fn enter(mut self, key: impl Into<String>) -> Self {
        self.current_path.push(key.into());
        self.message_sent = false;
        self
    }

    pub fn back(mut self) -> Self {
        self.current_path.pop();
        self.message_sent = false;
        self
    }

    pub fn home(mut self) -> Self {
        self.current_path.clear();
        self.message_sent = false;
        self
    }

    /// Jump straight to a path picked from search results.
    pub fn jump_to(mut self, path: Vec<String>) -> Self {
        self.current_path = path;
        self.message_sent = false;
        self.show_search = false;
        self
    }

    pub fn open_search(mut self) -> Self {
        self.show_search = true;
        self
    }

    pub fn close_search(mut self) -> Self {
        self.show_search = false;
        self
    }

    pub fn open_ask(mut self) -> Self {
        self.show_ask = true;
        self
    }

    pub fn close_ask(mut self) -> Self {
        self.show_ask = false;
        self
    }

    pub fn mark_sent(mut self) -> Self {
        self.message_sent = true;
        self
    }

    pub fn is_root(&self) -> bool {
        self.current_path.is_empty()
    }

    /// Resolve the current path. A path that no longer resolves sends the
    /// session back to the root instead of failing.
    pub fn view(self, root: &ConceptNode) -> Viewed {
        match resolve(root, &self.current_path) {
            Some(node) => {
                let view = node_view(node, &self.current_path);
                Viewed {
                    session: self,
                    view,
                    recovered: false,
                }
            }
            None => {
                tracing::warn!(path = ?self.current_path, "path no longer resolves, returning to root");
                let session = self.home();
                Viewed {
                    view: node_view(root, &session.current_path),
                    session,
                    recovered: true,
                }
            }
        }
    }
}

fn node_view(node: &ConceptNode, path: &[String]) -> NodeView {
    let body = match &node.kind {
        NodeKind::Leaf { message } => ViewBody::Leaf {
            message: message.clone(),
        },
        NodeKind::Category { children } if !children.is_empty() => ViewBody::Category {
            entries: children
                .iter()
                .map(|(key, child)| ChildEntry {
                    key: key.clone(),
                    title: display_title(key, child).to_string(),
                    is_leaf: is_leaf(child),
                })
                .collect(),
        },
        NodeKind::Category { .. } | NodeKind::Empty => ViewBody::Empty,
    };

    NodeView {
        title: node.title.clone(),
        description: node.description.clone(),
        breadcrumb: breadcrumb(path),
        body,
    }
}
