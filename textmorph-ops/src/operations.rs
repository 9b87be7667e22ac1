//! Backend-powered text operations.
//!
//! Each [`TextOperation`] wraps one backend capability and turns its output
//! into child nodes holding text: one child per token, sentence, paragraph,
//! n-gram, lemma or entity, or a single child for whole-text results.

use crate::backend::TextBackend;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use textmorph_core::{
    ComplexityClass, Node, Operation, OperationCategory, OperationCost, OperationError,
    ValidationResult,
};

/// Inputs above this many characters validate with a warning.
const LARGE_INPUT_CHARS: usize = 1_000_000;

/// Rough characters-per-token ratio used for cost estimates.
const CHARS_PER_TOKEN: u64 = 4;

/// A backend capability exposed as an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Tokenize,
    Sentencize,
    Paragraphize,
    NormalizeWhitespace,
    WordCount,
    /// Word sequences of the given length.
    Ngrams(usize),
    Stem,
    RemoveStopWords,
    PosTag,
    Lemmatize,
    ExtractEntities,
}

impl Capability {
    /// Every capability registered by the text catalog.
    pub const ALL: [Capability; 12] = [
        Capability::Tokenize,
        Capability::Sentencize,
        Capability::Paragraphize,
        Capability::NormalizeWhitespace,
        Capability::WordCount,
        Capability::Ngrams(2),
        Capability::Ngrams(3),
        Capability::Stem,
        Capability::RemoveStopWords,
        Capability::PosTag,
        Capability::Lemmatize,
        Capability::ExtractEntities,
    ];

    /// Stable operation name, e.g. `tokenize` or `bigrams`.
    pub fn operation_name(&self) -> String {
        match self {
            Capability::Tokenize => "tokenize".into(),
            Capability::Sentencize => "sentencize".into(),
            Capability::Paragraphize => "paragraphize".into(),
            Capability::NormalizeWhitespace => "normalize_whitespace".into(),
            Capability::WordCount => "word_count".into(),
            Capability::Ngrams(2) => "bigrams".into(),
            Capability::Ngrams(3) => "trigrams".into(),
            Capability::Ngrams(n) => format!("ngrams_{n}"),
            Capability::Stem => "stem".into(),
            Capability::RemoveStopWords => "remove_stop_words".into(),
            Capability::PosTag => "pos_tag".into(),
            Capability::Lemmatize => "lemmatize".into(),
            Capability::ExtractEntities => "extract_entities".into(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::Tokenize => "Split text into word and punctuation tokens",
            Capability::Sentencize => "Split text into sentences",
            Capability::Paragraphize => "Split text into paragraphs",
            Capability::NormalizeWhitespace => "Collapse runs of whitespace into single spaces",
            Capability::WordCount => "Count the words in the text",
            Capability::Ngrams(_) => "Emit space-joined word n-grams",
            Capability::Stem => "Tokenize, then reduce each token to its stem",
            Capability::RemoveStopWords => "Tokenize, then drop stop words",
            Capability::PosTag => "Tag each token with its part of speech as token/TAG",
            Capability::Lemmatize => "Reduce each word to its lemma",
            Capability::ExtractEntities => "Extract named entities as text/LABEL",
        }
    }
}

/// An `Operation<String>` backed by a [`TextBackend`] capability.
pub struct TextOperation {
    capability: Capability,
    name: String,
    backend: Arc<dyn TextBackend>,
}

impl TextOperation {
    pub fn new(capability: Capability, backend: Arc<dyn TextBackend>) -> Self {
        Self {
            capability,
            name: capability.operation_name(),
            backend,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Run the capability and render its result as child payloads.
    async fn outputs(&self, text: &str) -> Result<Vec<String>, OperationError> {
        let backend = &self.backend;
        let outputs = match self.capability {
            Capability::Tokenize => backend.tokenize(text).await?,
            Capability::Sentencize => backend.sentencize(text).await?,
            Capability::Paragraphize => backend.paragraphize(text).await?,
            Capability::NormalizeWhitespace => vec![backend.normalize_whitespace(text).await?],
            Capability::WordCount => vec![backend.word_count(text).await?.to_string()],
            Capability::Ngrams(n) => backend
                .ngrams(text, n)
                .await?
                .into_iter()
                .map(|gram| gram.join(" "))
                .collect(),
            Capability::Stem => {
                let tokens = backend.tokenize(text).await?;
                backend.stem(&tokens).await?
            }
            Capability::RemoveStopWords => {
                let tokens = backend.tokenize(text).await?;
                backend.remove_stop_words(&tokens).await?
            }
            Capability::PosTag => backend
                .pos_tag(text)
                .await?
                .into_iter()
                .map(|t| format!("{}/{}", t.token, t.tag))
                .collect(),
            Capability::Lemmatize => backend.lemmatize(text).await?,
            Capability::ExtractEntities => backend
                .extract_entities(text)
                .await?
                .into_iter()
                .map(|e| format!("{}/{}", e.text, e.label))
                .collect(),
        };
        Ok(outputs)
    }
}

#[async_trait]
impl Operation<String> for TextOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.capability.description()
    }

    fn category(&self) -> OperationCategory {
        OperationCategory::BackendPowered
    }

    fn validate(&self, node: &Node<String>) -> ValidationResult {
        if node.data.trim().is_empty() {
            return ValidationResult::invalid("text is empty");
        }
        let chars = node.data.chars().count();
        if chars > LARGE_INPUT_CHARS {
            return ValidationResult::ok().with_warning(format!("large input: {chars} characters"));
        }
        ValidationResult::ok()
    }

    fn estimate_cost(&self, node: &Node<String>) -> OperationCost {
        let chars = node.data.chars().count() as u64;
        OperationCost::new(
            Duration::from_micros(chars),
            chars.div_ceil(CHARS_PER_TOKEN),
            node.data.len() as u64 * 2,
            ComplexityClass::Linear,
        )
    }

    async fn apply(&self, node: &Node<String>) -> Result<Vec<Node<String>>, OperationError> {
        let outputs = self.outputs(&node.data).await?;
        Ok(outputs
            .into_iter()
            .map(|text| Node::child(node, text, self.name.as_str()))
            .collect())
    }
}
