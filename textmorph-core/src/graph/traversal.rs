//! Structural traversals: fold (catamorphism) and unfold (anamorphism).
//!
//! `fold` reduces the graph bottom-up, one result per root. It keeps a memo
//! table keyed by node id so a node reachable along several paths is reduced
//! exactly once. With the current single-parent forest every node has one
//! path, but the memo becomes required as soon as multi-parent merges exist,
//! so it must stay.
//!
//! `unfold` grows a graph top-down from a seed. The accumulating graph has a
//! single owner for the whole call; insertions are always serialized, even
//! in [`Graph::unfold_concurrent`] where sibling seeds expand concurrently.

use crate::error::GraphError;
use crate::graph::node::{Node, NodeId};
use crate::graph::store::Graph;
use std::collections::{HashMap, HashSet};
use std::future::Future;

impl<A> Graph<A> {
    /// Bottom-up reduction. `algebra` receives a node and its children's
    /// results in declaration order.
    ///
    /// A child id that does not resolve aborts the whole fold with
    /// [`GraphError::MissingNode`].
    pub fn fold<B, F>(&self, mut algebra: F) -> Result<Vec<B>, GraphError>
    where
        B: Clone,
        F: FnMut(&Node<A>, Vec<B>) -> B,
    {
        let mut memo: HashMap<NodeId, B> = HashMap::with_capacity(self.len());
        let mut visiting: HashSet<NodeId> = HashSet::new();

        self.roots
            .iter()
            .map(|root| self.fold_node(*root, &mut algebra, &mut memo, &mut visiting))
            .collect()
    }

    fn fold_node<B, F>(
        &self,
        id: NodeId,
        algebra: &mut F,
        memo: &mut HashMap<NodeId, B>,
        visiting: &mut HashSet<NodeId>,
    ) -> Result<B, GraphError>
    where
        B: Clone,
        F: FnMut(&Node<A>, Vec<B>) -> B,
    {
        if let Some(done) = memo.get(&id) {
            return Ok(done.clone());
        }
        let node = self.nodes.get(&id).ok_or(GraphError::MissingNode { id })?;
        if !visiting.insert(id) {
            return Err(GraphError::Cycle { id });
        }

        let child_ids = self.child_ids(id);
        let mut child_results = Vec::with_capacity(child_ids.len());
        for child in child_ids {
            child_results.push(self.fold_node(*child, algebra, memo, visiting)?);
        }
        visiting.remove(&id);

        let result = algebra(node, child_results);
        memo.insert(id, result.clone());
        Ok(result)
    }

    /// Top-down construction from `seed`.
    ///
    /// `coalgebra` turns a seed into a node payload plus child seeds. Nodes
    /// are inserted depth-first, children in the order the coalgebra lists
    /// them.
    pub fn unfold<S, F>(seed: S, mut coalgebra: F) -> Self
    where
        F: FnMut(S) -> (A, Vec<S>),
    {
        let mut graph = Graph::empty();
        let mut pending: Vec<(S, Option<NodeId>)> = vec![(seed, None)];

        while let Some((seed, parent)) = pending.pop() {
            let (data, child_seeds) = coalgebra(seed);
            let node = Node::with_parent(data, parent);
            let id = node.id;
            graph.attach(node);
            pending.extend(child_seeds.into_iter().rev().map(|s| (s, Some(id))));
        }
        graph
    }

    /// Level-by-level unfold whose sibling coalgebra calls run concurrently.
    ///
    /// Expansion of one level is awaited as a whole, then its nodes are
    /// inserted one at a time in seed order, so the result is deterministic.
    pub async fn unfold_concurrent<S, F, Fut>(seed: S, coalgebra: F) -> Self
    where
        F: Fn(S) -> Fut,
        Fut: Future<Output = (A, Vec<S>)>,
    {
        let mut graph = Graph::empty();
        let mut frontier: Vec<(S, Option<NodeId>)> = vec![(seed, None)];

        while !frontier.is_empty() {
            let (seeds, parents): (Vec<S>, Vec<Option<NodeId>>) = frontier.into_iter().unzip();
            let expanded = futures::future::join_all(seeds.into_iter().map(&coalgebra)).await;

            let mut next = Vec::new();
            for ((data, child_seeds), parent) in expanded.into_iter().zip(parents) {
                let node = Node::with_parent(data, parent);
                let id = node.id;
                graph.attach(node);
                next.extend(child_seeds.into_iter().map(|s| (s, Some(id))));
            }
            frontier = next;
        }
        graph
    }
}
