//! Graph store: immutable forest of processing nodes plus fold/unfold.

pub mod node;
pub mod store;
pub mod traversal;

pub use node::{Node, NodeId, NodeMetadata};
pub use store::Graph;
