//! Operation catalog: a name to operation registry.
//!
//! Operations are registered once and looked up by name. The catalog holds
//! no runtime state beyond the mapping itself.

use crate::error::OperationError;
use crate::operation::{Operation, OperationCategory};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Summary of a registered operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
    pub category: OperationCategory,
}

/// The catalog holds all registered operations for one payload type.
pub struct OperationCatalog<A, B = A> {
    operations: HashMap<String, Arc<dyn Operation<A, B>>>,
}

impl<A, B> OperationCatalog<A, B> {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Register an operation. Returns error if the name is already taken.
    pub fn register(&mut self, operation: Arc<dyn Operation<A, B>>) -> Result<(), OperationError> {
        let name = operation.name().to_string();
        if self.operations.contains_key(&name) {
            return Err(OperationError::AlreadyRegistered { name });
        }
        debug!(operation = %name, category = %operation.category(), "Registering operation");
        self.operations.insert(name, operation);
        Ok(())
    }

    /// Unregister an operation by name.
    pub fn unregister(&mut self, name: &str) -> Result<(), OperationError> {
        if self.operations.remove(name).is_none() {
            return Err(OperationError::NotFound {
                name: name.to_string(),
            });
        }
        debug!(operation = %name, "Unregistered operation");
        Ok(())
    }

    pub fn get_operation(&self, name: &str) -> Option<Arc<dyn Operation<A, B>>> {
        self.operations.get(name).cloned()
    }

    /// Like [`OperationCatalog::get_operation`], with a `NotFound` error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Operation<A, B>>, OperationError> {
        self.get_operation(name).ok_or_else(|| OperationError::NotFound {
            name: name.to_string(),
        })
    }

    /// All registered names, sorted.
    pub fn get_operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name, description and category of every operation, sorted by name.
    pub fn list_info(&self) -> Vec<OperationInfo> {
        let mut info: Vec<OperationInfo> = self
            .operations
            .values()
            .map(|op| OperationInfo {
                name: op.name().to_string(),
                description: op.description().to_string(),
                category: op.category(),
            })
            .collect();
        info.sort_by(|a, b| a.name.cmp(&b.name));
        info
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl<A, B> Default for OperationCatalog<A, B> {
    fn default() -> Self {
        Self::new()
    }
}
