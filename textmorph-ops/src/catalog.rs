//! Builds the catalog of text operations over one backend.

use crate::backend::TextBackend;
use crate::operations::{Capability, TextOperation};
use std::sync::Arc;
use textmorph_core::{OperationCatalog, OperationError};
use tracing::debug;

/// Register one [`TextOperation`] per capability, sharing `backend`.
pub fn register_text_operations(
    catalog: &mut OperationCatalog<String>,
    backend: Arc<dyn TextBackend>,
) -> Result<(), OperationError> {
    for capability in Capability::ALL {
        catalog.register(Arc::new(TextOperation::new(capability, Arc::clone(&backend))))?;
    }
    debug!(backend = %backend.name(), count = Capability::ALL.len(), "Registered text operations");
    Ok(())
}

/// A fresh catalog holding every text operation.
pub fn text_catalog(backend: Arc<dyn TextBackend>) -> Result<OperationCatalog<String>, OperationError> {
    let mut catalog = OperationCatalog::new();
    register_text_operations(&mut catalog, backend)?;
    Ok(catalog)
}
