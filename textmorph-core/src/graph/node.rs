//! Node and identifier types for the graph store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, never-reused node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for NodeId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Provenance attached to every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Name of the operation that produced this node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Distance from the root. Recomputed by the graph on insertion.
    pub depth: usize,
}

/// A unit of data with a single optional parent.
///
/// Nodes are immutable once inserted into a graph; a transformed node is a
/// new `Node` value with its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<A> {
    pub id: NodeId,
    pub data: A,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub metadata: NodeMetadata,
}

impl<A> Node<A> {
    /// Create a parentless node at depth 0.
    pub fn root(data: A) -> Self {
        Self {
            id: NodeId::new(),
            data,
            parent: None,
            metadata: NodeMetadata {
                operation_name: None,
                timestamp: Utc::now(),
                depth: 0,
            },
        }
    }

    /// Create a node attached below `parent`, tagged with the producing operation.
    pub fn child<P>(parent: &Node<P>, data: A, operation_name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            data,
            parent: Some(parent.id),
            metadata: NodeMetadata {
                operation_name: Some(operation_name.into()),
                timestamp: Utc::now(),
                depth: parent.metadata.depth + 1,
            },
        }
    }

    /// Create a node with an explicit parent reference and no provenance.
    ///
    /// The depth starts at 0 whatever the parent is; the graph assigns the
    /// real depth when the node is inserted, so read it back from the graph.
    pub fn with_parent(data: A, parent: Option<NodeId>) -> Self {
        Self {
            id: NodeId::new(),
            data,
            parent,
            metadata: NodeMetadata {
                operation_name: None,
                timestamp: Utc::now(),
                depth: 0,
            },
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn depth(&self) -> usize {
        self.metadata.depth
    }

    /// Replace the payload, keeping identity and structure.
    pub fn map_data<B>(&self, f: impl FnOnce(&A) -> B) -> Node<B> {
        Node {
            id: self.id,
            data: f(&self.data),
            parent: self.parent,
            metadata: self.metadata.clone(),
        }
    }
}
