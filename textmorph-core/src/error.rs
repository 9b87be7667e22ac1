//! Error types for the textmorph core.
//!
//! Uses `thiserror` for public API error types. Structural failures
//! (`GraphError`) and configuration failures (`ExecutionError`, `ConfigError`)
//! abort the call in progress; per-node failures are collected as
//! [`NodeError`] values inside an operation result instead of being returned.

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};

/// Top-level error type for the textmorph core library.
#[derive(Debug, thiserror::Error)]
pub enum TextmorphError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structural invariant violations in the graph store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Node {node} references parent {parent} which is not in the graph")]
    DanglingParent { node: NodeId, parent: NodeId },

    #[error("Node {id} is referenced but not present in the graph")]
    MissingNode { id: NodeId },

    #[error("Node {node} is already attached to {existing}, cannot attach to {requested}")]
    ParentConflict {
        node: NodeId,
        existing: String,
        requested: String,
    },

    #[error("Cycle detected while traversing node {id}")]
    Cycle { id: NodeId },
}

/// Errors raised by an operation's `apply`, or by the operation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationError {
    #[error("Operation '{operation}' failed: {message}")]
    Failed { operation: String, message: String },

    #[error("Backend '{backend}' does not support '{operation}'")]
    BackendNotSupported { backend: String, operation: String },

    #[error("Invalid input for operation '{operation}': {reason}")]
    InvalidInput { operation: String, reason: String },

    #[error("Operation not found: {name}")]
    NotFound { name: String },

    #[error("Operation already registered: {name}")]
    AlreadyRegistered { name: String },
}

impl OperationError {
    /// Shorthand for the common `Failed` variant.
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        OperationError::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// A failure of the result store. Never fatal to an execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Storage operation '{operation}' failed: {cause}")]
pub struct StorageError {
    pub operation: String,
    pub cause: String,
}

impl StorageError {
    pub fn new(operation: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            cause: cause.into(),
        }
    }
}

/// Invalid configuration or top-level executor failure.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Parallel strategy requires concurrency >= 1, got {concurrency}")]
    InvalidConcurrency { concurrency: usize },

    #[error("Batch strategy requires batch size >= 1, got {batch_size}")]
    InvalidBatchSize { batch_size: usize },

    #[error("Graph error during execution: {0}")]
    Graph(#[from] GraphError),

    #[error("Execution aborted: {message}")]
    Aborted { message: String },
}

/// A per-node failure, recorded in `OperationResult::errors`.
///
/// None of these abort the enclosing `execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeError {
    #[error("Validation of node {node_id} failed for '{operation}': {}", errors.join("; "))]
    Validation {
        node_id: NodeId,
        operation: String,
        errors: Vec<String>,
    },

    #[error("Operation '{operation}' timed out on node {node_id} after {timeout_ms}ms")]
    Timeout {
        node_id: NodeId,
        operation: String,
        timeout_ms: u64,
    },

    #[error("Operation failed on node {node_id}: {source}")]
    Operation {
        node_id: NodeId,
        source: OperationError,
    },
}

impl NodeError {
    /// The node this failure belongs to.
    pub fn node_id(&self) -> NodeId {
        match self {
            NodeError::Validation { node_id, .. }
            | NodeError::Timeout { node_id, .. }
            | NodeError::Operation { node_id, .. } => *node_id,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, NodeError::Validation { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NodeError::Timeout { .. })
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("Configuration serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

/// A type alias for results using the top-level `TextmorphError`.
pub type Result<T> = std::result::Result<T, TextmorphError>;
