//! # Textmorph Core
//!
//! Core library for textmorph: text transformations modelled as operations
//! over an immutable forest of nodes.
//! Provides the graph store with fold/unfold traversals, the operation
//! contract and catalog, the executor and its strategies, the result cache,
//! metrics, configuration, and tracing setup.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod metrics;
pub mod operation;
pub mod telemetry;

// Re-export commonly used types at the crate root.
pub use cache::{CacheStats, ResultCache, ResultKey, ResultStore, StoredResult};
pub use config::{TextmorphConfig, load_config};
pub use error::{
    ConfigError, ExecutionError, GraphError, NodeError, OperationError, Result, StorageError,
    TextmorphError,
};
pub use executor::{
    ExecutionOptions, Executor, NodeOutcome, NodeSelector, NodeStatus, NodeTrace, OperationResult,
    Strategy,
};
pub use graph::{Graph, Node, NodeId, NodeMetadata};
pub use metrics::ExecutionMetrics;
pub use operation::{
    ComplexityClass, Operation, OperationCatalog, OperationCategory, OperationCost,
    ValidationResult,
};
