//! Operation contract: the unit of transformation applied by the executor.
//!
//! An operation turns one node into zero or more child nodes. It is named,
//! carries a category tag, and can validate its input and estimate its cost
//! before the executor commits to running it.

pub mod catalog;
pub mod combinators;
pub mod cost;

use crate::error::OperationError;
use crate::graph::Node;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use catalog::OperationCatalog;
pub use combinators::{
    FnOperation, Identity, compose, expand, expand_async, filter, identity, transform,
    transform_async, try_expand,
};
pub use cost::{ComplexityClass, OperationCost};

/// What kind of structural change an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    /// One node in, exactly one child out.
    Transformation,
    /// One node in, any number of children out.
    Expansion,
    Aggregation,
    /// One node in, zero or one child out.
    Filtering,
    Composition,
    /// Delegates to an external analysis backend.
    BackendPowered,
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationCategory::Transformation => write!(f, "transformation"),
            OperationCategory::Expansion => write!(f, "expansion"),
            OperationCategory::Aggregation => write!(f, "aggregation"),
            OperationCategory::Filtering => write!(f, "filtering"),
            OperationCategory::Composition => write!(f, "composition"),
            OperationCategory::BackendPowered => write!(f, "backend-powered"),
        }
    }
}

/// Outcome of [`Operation::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Valid only if both are valid; errors and warnings are concatenated.
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Trait that all operations must implement.
#[async_trait]
pub trait Operation<A, B = A>: Send + Sync {
    /// The unique name of this operation. Also half of the cache key.
    fn name(&self) -> &str;

    /// Human-readable description of what this operation does.
    fn description(&self) -> &str;

    fn category(&self) -> OperationCategory;

    /// Check preconditions on `node`. The default accepts everything.
    fn validate(&self, _node: &Node<A>) -> ValidationResult {
        ValidationResult::ok()
    }

    /// Estimate the cost of applying this operation to `node`.
    fn estimate_cost(&self, _node: &Node<A>) -> OperationCost {
        OperationCost::zero()
    }

    /// Produce the children of `node`.
    async fn apply(&self, node: &Node<A>) -> Result<Vec<Node<B>>, OperationError>;
}
