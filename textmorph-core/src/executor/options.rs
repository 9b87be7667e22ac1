//! Execution options: strategy, cache/trace switches, timeout and target selection.

use crate::error::{ExecutionError, GraphError};
use crate::graph::{Graph, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Concurrency policy for applying an operation across target nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "size", rename_all = "snake_case")]
pub enum Strategy {
    /// One node at a time, in input order.
    #[default]
    Sequential,
    /// Up to N node applications in flight.
    Parallel(usize),
    /// Consecutive chunks of this size; full concurrency within a chunk.
    Batch(usize),
    /// One node at a time, each outcome published as soon as it completes.
    ///
    /// [`Executor::execute`](crate::executor::Executor::execute) waits for
    /// the whole stream, so its result matches `Sequential`. Consume outcomes
    /// incrementally with
    /// [`Executor::execute_stream`](crate::executor::Executor::execute_stream),
    /// which also runs several nodes at once under `Parallel` or `Batch`.
    Streaming,
}

impl Strategy {
    /// Reject zero concurrency or batch size.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        match *self {
            Strategy::Parallel(0) => Err(ExecutionError::InvalidConcurrency { concurrency: 0 }),
            Strategy::Batch(0) => Err(ExecutionError::InvalidBatchSize { batch_size: 0 }),
            _ => Ok(()),
        }
    }

    /// Maximum number of node applications in flight at once.
    pub fn width(&self) -> usize {
        match *self {
            Strategy::Parallel(n) | Strategy::Batch(n) => n.max(1),
            Strategy::Sequential | Strategy::Streaming => 1,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::Parallel(n) => write!(f, "parallel({n})"),
            Strategy::Batch(n) => write!(f, "batch({n})"),
            Strategy::Streaming => write!(f, "streaming"),
        }
    }
}

/// Which nodes of the input graph an execution targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSelector {
    /// Every node, in insertion order.
    #[default]
    All,
    Roots,
    /// Nodes without children.
    Leaves,
    /// Nodes at exactly this depth.
    Depth(usize),
    /// Exactly these nodes, in the given order.
    Ids(Vec<NodeId>),
}

impl NodeSelector {
    /// Resolve the selector against `graph`. An unknown id is a structural error.
    pub fn select<A: Clone>(&self, graph: &Graph<A>) -> Result<Vec<Node<A>>, GraphError> {
        let selected = match self {
            NodeSelector::All => graph.nodes().cloned().collect(),
            NodeSelector::Roots => graph.get_roots().into_iter().cloned().collect(),
            NodeSelector::Leaves => graph.leaves().into_iter().cloned().collect(),
            NodeSelector::Depth(depth) => graph
                .nodes()
                .filter(|node| node.depth() == *depth)
                .cloned()
                .collect(),
            NodeSelector::Ids(ids) => ids
                .iter()
                .map(|id| {
                    graph
                        .get_node(*id)
                        .cloned()
                        .ok_or(GraphError::MissingNode { id: *id })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(selected)
    }
}

/// Options for one `Executor::execute` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub strategy: Strategy,
    /// Consult and populate the result store.
    pub cache: bool,
    /// Open a span per node and record a `NodeTrace` per node.
    pub trace: bool,
    /// Per-node deadline for `apply`.
    pub timeout: Option<Duration>,
    pub selector: NodeSelector,
}

impl ExecutionOptions {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_selector(mut self, selector: NodeSelector) -> Self {
        self.selector = selector;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Graph<&'static str>, NodeId, NodeId, NodeId) {
        let graph = Graph::singleton("root");
        let root = graph.root_ids()[0];
        let a = Node::with_parent("a", Some(root));
        let b = Node::with_parent("b", Some(root));
        let c = Node::with_parent("c", Some(a.id));
        let (a_id, b_id) = (a.id, b.id);
        let graph = graph.add_nodes(vec![a, b, c]).unwrap();
        (graph, root, a_id, b_id)
    }

    fn data<A: Copy>(nodes: &[Node<A>]) -> Vec<A> {
        nodes.iter().map(|n| n.data).collect()
    }

    #[test]
    fn test_strategy_validate() {
        assert!(Strategy::Sequential.validate().is_ok());
        assert!(Strategy::Parallel(4).validate().is_ok());
        assert!(matches!(
            Strategy::Parallel(0).validate(),
            Err(ExecutionError::InvalidConcurrency { concurrency: 0 })
        ));
        assert!(matches!(
            Strategy::Batch(0).validate(),
            Err(ExecutionError::InvalidBatchSize { batch_size: 0 })
        ));
    }

    #[test]
    fn test_strategy_display_and_width() {
        assert_eq!(Strategy::Parallel(3).to_string(), "parallel(3)");
        assert_eq!(Strategy::Batch(2).width(), 2);
        assert_eq!(Strategy::Streaming.width(), 1);
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_value(Strategy::Batch(8)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "batch", "size": 8}));
        let back: Strategy = serde_json::from_value(serde_json::json!({"kind": "sequential"})).unwrap();
        assert_eq!(back, Strategy::Sequential);
    }

    #[test]
    fn test_select_all_in_insertion_order() {
        let (graph, ..) = sample();
        let nodes = NodeSelector::All.select(&graph).unwrap();
        assert_eq!(data(&nodes), vec!["root", "a", "b", "c"]);
    }

    #[test]
    fn test_select_roots_leaves_depth() {
        let (graph, ..) = sample();
        assert_eq!(data(&NodeSelector::Roots.select(&graph).unwrap()), vec!["root"]);
        assert_eq!(data(&NodeSelector::Leaves.select(&graph).unwrap()), vec!["b", "c"]);
        assert_eq!(data(&NodeSelector::Depth(1).select(&graph).unwrap()), vec!["a", "b"]);
        assert!(NodeSelector::Depth(9).select(&graph).unwrap().is_empty());
    }

    #[test]
    fn test_select_ids_keeps_given_order() {
        let (graph, root, a, b) = sample();
        let nodes = NodeSelector::Ids(vec![b, root, a]).select(&graph).unwrap();
        assert_eq!(data(&nodes), vec!["b", "root", "a"]);
    }

    #[test]
    fn test_select_unknown_id_is_graph_error() {
        let (graph, ..) = sample();
        let missing = NodeId::new();
        let err = NodeSelector::Ids(vec![missing]).select(&graph).unwrap_err();
        assert_eq!(err, GraphError::MissingNode { id: missing });
    }

    #[test]
    fn test_options_builder() {
        let options = ExecutionOptions::new(Strategy::Parallel(2))
            .with_cache(true)
            .with_trace(true)
            .with_timeout(Duration::from_millis(10))
            .with_selector(NodeSelector::Roots);
        assert_eq!(options.strategy, Strategy::Parallel(2));
        assert!(options.cache && options.trace);
        assert_eq!(options.timeout, Some(Duration::from_millis(10)));
        assert_eq!(options.selector, NodeSelector::Roots);
        assert_eq!(ExecutionOptions::default().strategy, Strategy::Sequential);
    }
}
