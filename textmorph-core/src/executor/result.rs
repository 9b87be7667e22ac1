//! Execution results: per-node outcomes, traces and the aggregated report.

use crate::error::{GraphError, NodeError};
use crate::graph::{Graph, Node, NodeId};
use crate::metrics::ExecutionMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// What happened to one target node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome<B> {
    pub node_id: NodeId,
    /// Children produced for this node (empty on failure).
    pub new_nodes: Vec<Node<B>>,
    pub error: Option<NodeError>,
    pub metrics: ExecutionMetrics,
    pub cache_hit: bool,
}

impl<B> NodeOutcome<B> {
    pub(crate) fn failed(node_id: NodeId, error: NodeError, metrics: ExecutionMetrics) -> Self {
        Self {
            node_id,
            new_nodes: Vec::new(),
            error: Some(error),
            metrics,
            cache_hit: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> NodeStatus {
        match &self.error {
            None if self.cache_hit => NodeStatus::CacheHit,
            None => NodeStatus::Applied,
            Some(NodeError::Validation { .. }) => NodeStatus::Invalid,
            Some(NodeError::Timeout { .. }) => NodeStatus::TimedOut,
            Some(NodeError::Operation { .. }) => NodeStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Applied,
    CacheHit,
    Invalid,
    TimedOut,
    Failed,
}

/// Per-node record kept when tracing is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTrace {
    pub node_id: NodeId,
    pub status: NodeStatus,
    pub elapsed: Duration,
    pub children: usize,
}

impl<B> From<&NodeOutcome<B>> for NodeTrace {
    fn from(outcome: &NodeOutcome<B>) -> Self {
        Self {
            node_id: outcome.node_id,
            status: outcome.status(),
            elapsed: outcome.metrics.duration,
            children: outcome.new_nodes.len(),
        }
    }
}

/// Report of one executor call. Created once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<B> {
    pub execution_id: Uuid,
    pub operation: String,
    /// Children of every successful target, in target order.
    pub new_nodes: Vec<Node<B>>,
    pub errors: Vec<NodeError>,
    pub metrics: ExecutionMetrics,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<NodeTrace>,
}

impl<B> OperationResult<B> {
    /// Aggregate outcomes (already in target order). All counters are sums of
    /// the per-node metrics; `duration` is the supplied wall-clock time.
    pub fn from_outcomes(
        execution_id: Uuid,
        operation: impl Into<String>,
        outcomes: Vec<NodeOutcome<B>>,
        wall_clock: Duration,
        trace: bool,
    ) -> Self {
        let mut metrics: ExecutionMetrics = outcomes.iter().map(|o| o.metrics).sum();
        metrics.duration = wall_clock;

        let trace = if trace {
            outcomes.iter().map(NodeTrace::from).collect()
        } else {
            Vec::new()
        };

        let mut new_nodes = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            new_nodes.extend(outcome.new_nodes);
            errors.extend(outcome.error);
        }

        Self {
            execution_id,
            operation: operation.into(),
            new_nodes,
            errors,
            metrics,
            timestamp: Utc::now(),
            trace,
        }
    }

    /// True when no target node failed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<B: Clone> OperationResult<B> {
    /// Insert the produced nodes into `graph`, returning the new graph.
    pub fn fold_into(&self, graph: &Graph<B>) -> Result<Graph<B>, GraphError> {
        graph.add_nodes(self.new_nodes.iter().cloned())
    }
}
