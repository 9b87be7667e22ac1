//! Persistent graph store.
//!
//! A `Graph` is a value: every insertion returns a new graph and leaves the
//! receiver untouched. The representation is plain associative containers
//! copied on write, so an insertion costs O(n) in the size of the graph.
//! Callers that fold many nodes at once should prefer [`Graph::add_nodes`],
//! which pays the copy once per batch instead of once per node.

use crate::error::GraphError;
use crate::graph::node::{Node, NodeId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// An immutable forest of parent-linked nodes.
///
/// Invariants maintained by every constructor:
/// - `roots` holds exactly the nodes whose `parent` is `None`.
/// - every parent reference resolves, and the child appears in
///   `children[parent]` exactly once.
/// - a node's depth is 0 for roots and `parent.depth + 1` otherwise.
///
/// Serialized as its node list in insertion order; deserializing replays
/// that list through [`Graph::from_nodes`], so a snapshot is held to the
/// same checks as [`Graph::add_node`].
#[derive(Debug, Clone, PartialEq)]
pub struct Graph<A> {
    pub(crate) nodes: HashMap<NodeId, Node<A>>,
    /// Insertion order, used for deterministic iteration.
    pub(crate) order: Vec<NodeId>,
    pub(crate) roots: Vec<NodeId>,
    /// Parent to children, in declaration order.
    pub(crate) children: HashMap<NodeId, Vec<NodeId>>,
}

impl<A> Default for Graph<A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A> Graph<A> {
    /// A graph with no nodes and no roots.
    pub fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            roots: Vec::new(),
            children: HashMap::new(),
        }
    }

    /// A graph holding a single root node built from `data`.
    pub fn singleton(data: A) -> Self {
        let mut graph = Self::empty();
        graph.attach(Node::root(data));
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node<A>> {
        self.nodes.get(&id)
    }

    /// Children of `id` in declaration order. Unknown ids yield an empty list.
    pub fn get_children(&self, id: NodeId) -> Vec<&Node<A>> {
        self.child_ids(id)
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .collect()
    }

    pub fn child_ids(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parentless nodes in insertion order.
    pub fn get_roots(&self) -> Vec<&Node<A>> {
        self.roots.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes without children, in insertion order.
    pub fn leaves(&self) -> Vec<&Node<A>> {
        self.nodes()
            .filter(|node| self.child_ids(node.id).is_empty())
            .collect()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<A>> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Apply `f` to every payload, preserving ids, parents and metadata.
    pub fn map<B>(&self, mut f: impl FnMut(&A) -> B) -> Graph<B> {
        Graph {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| (*id, node.map_data(|data| f(data))))
                .collect(),
            order: self.order.clone(),
            roots: self.roots.clone(),
            children: self.children.clone(),
        }
    }

    /// Depth-first post-order walk over the roots: every node is emitted
    /// after all of its descendants.
    pub fn post_order(&self) -> Vec<&Node<A>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, bool)> = self.roots.iter().rev().map(|id| (*id, false)).collect();

        while let Some((id, expanded)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if expanded {
                out.push(node);
                continue;
            }
            stack.push((id, true));
            for child in self.child_ids(id).iter().rev() {
                stack.push((*child, false));
            }
        }
        out
    }

    /// Indented pre-order rendering for diagnostics.
    pub fn show(&self, render: impl Fn(&A) -> String) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().rev().map(|id| (*id, 0)).collect();

        while let Some((id, level)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push_str(&"  ".repeat(level));
            out.push_str("- ");
            out.push_str(&render(&node.data));
            if let Some(op) = &node.metadata.operation_name {
                out.push_str(" [");
                out.push_str(op);
                out.push(']');
            }
            out.push('\n');
            for child in self.child_ids(id).iter().rev() {
                stack.push((*child, level + 1));
            }
        }
        out
    }

    /// Insert a node whose parent (if any) is already known to be present.
    ///
    /// Depth is taken from the parent's stored depth. Re-inserting an id
    /// replaces the stored value without adding a second child edge.
    pub(crate) fn attach(&mut self, mut node: Node<A>) {
        node.metadata.depth = node
            .parent
            .and_then(|parent| self.nodes.get(&parent))
            .map_or(0, |parent| parent.metadata.depth + 1);

        if !self.nodes.contains_key(&node.id) {
            match node.parent {
                Some(parent) => self.children.entry(parent).or_default().push(node.id),
                None => self.roots.push(node.id),
            }
            self.order.push(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    fn insert(&mut self, node: Node<A>) -> Result<(), GraphError> {
        if let Some(parent) = node.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(GraphError::DanglingParent {
                    node: node.id,
                    parent,
                });
            }
        }
        if let Some(existing) = self.nodes.get(&node.id) {
            if existing.parent != node.parent {
                return Err(GraphError::ParentConflict {
                    node: node.id,
                    existing: describe_parent(existing.parent),
                    requested: describe_parent(node.parent),
                });
            }
        }
        self.attach(node);
        Ok(())
    }
}

impl<A: Clone> Graph<A> {
    /// Return a new graph containing `node`.
    ///
    /// Fails with [`GraphError::DanglingParent`] when the declared parent is
    /// not in the graph. Only parentless nodes become roots; inserting a
    /// child never changes the root set.
    pub fn add_node(&self, node: Node<A>) -> Result<Self, GraphError> {
        let mut next = self.clone();
        next.insert(node)?;
        Ok(next)
    }

    /// Return a new graph containing every node of `nodes`, inserted in order.
    ///
    /// Parents must precede their children in the sequence (or already be
    /// present). The receiver is left untouched on failure.
    pub fn add_nodes(&self, nodes: impl IntoIterator<Item = Node<A>>) -> Result<Self, GraphError> {
        let mut next = self.clone();
        for node in nodes {
            next.insert(node)?;
        }
        Ok(next)
    }

    /// Build a graph from a node sequence, parents first.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node<A>>) -> Result<Self, GraphError> {
        Self::empty().add_nodes(nodes)
    }

    /// Owned copy of [`Graph::post_order`].
    pub fn to_vec(&self) -> Vec<Node<A>> {
        self.post_order().into_iter().cloned().collect()
    }
}

impl<A: Serialize> Serialize for Graph<A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.nodes())
    }
}

impl<'de, A: Clone + Deserialize<'de>> Deserialize<'de> for Graph<A> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nodes = Vec::<Node<A>>::deserialize(deserializer)?;
        Graph::from_nodes(nodes).map_err(serde::de::Error::custom)
    }
}

fn describe_parent(parent: Option<NodeId>) -> String {
    parent.map_or_else(|| "root".to_string(), |id| id.to_string())
}
