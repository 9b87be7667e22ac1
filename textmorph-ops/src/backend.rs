//! Text analysis backend: the capability set behind text operations.
//!
//! A backend is constructed once (with whatever model it needs) and passed
//! explicitly into the operations that use it. Capabilities a backend does
//! not provide fail with `OperationError::BackendNotSupported`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use textmorph_core::OperationError;

/// A token with its part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: String,
    pub tag: String,
}

/// A named entity found in text. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// Trait that all text analysis backends must implement.
///
/// Every method is a deterministic function of its input for a given
/// backend instance.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Backend identifier, reported in `BackendNotSupported` errors.
    fn name(&self) -> &str;

    async fn tokenize(&self, text: &str) -> Result<Vec<String>, OperationError>;

    async fn sentencize(&self, text: &str) -> Result<Vec<String>, OperationError>;

    async fn paragraphize(&self, text: &str) -> Result<Vec<String>, OperationError>;

    async fn normalize_whitespace(&self, text: &str) -> Result<String, OperationError>;

    async fn word_count(&self, text: &str) -> Result<usize, OperationError>;

    /// Contiguous word sequences of length `n`.
    async fn ngrams(&self, text: &str, n: usize) -> Result<Vec<Vec<String>>, OperationError>;

    async fn stem(&self, tokens: &[String]) -> Result<Vec<String>, OperationError>;

    async fn remove_stop_words(&self, tokens: &[String]) -> Result<Vec<String>, OperationError>;

    async fn pos_tag(&self, _text: &str) -> Result<Vec<TaggedToken>, OperationError> {
        Err(self.unsupported("pos_tag"))
    }

    async fn lemmatize(&self, _text: &str) -> Result<Vec<String>, OperationError> {
        Err(self.unsupported("lemmatize"))
    }

    async fn extract_entities(&self, _text: &str) -> Result<Vec<Entity>, OperationError> {
        Err(self.unsupported("extract_entities"))
    }

    fn unsupported(&self, operation: &str) -> OperationError {
        OperationError::BackendNotSupported {
            backend: self.name().to_string(),
            operation: operation.to_string(),
        }
    }
}
