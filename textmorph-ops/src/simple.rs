//! Rule-based backend: regex tokenization, punctuation sentence splitting,
//! a suffix-stripping stemmer and an English stop word list.
//!
//! No language model is loaded; `pos_tag`, `lemmatize` and
//! `extract_entities` are reported as unsupported.

use crate::backend::TextBackend;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use textmorph_core::OperationError;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:['’-]\w+)*|[^\w\s]").expect("token pattern is valid"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:['’-]\w+)*").expect("word pattern is valid"));
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("sentence pattern is valid"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Suffix rewrites, tried in order; the first match wins.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("ization", "ize"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("iveness", "ive"),
    ("ingly", ""),
    ("edly", ""),
    ("sses", "ss"),
    ("ness", ""),
    ("ment", ""),
    ("ies", "y"),
    ("ing", ""),
    ("ed", ""),
    ("ly", ""),
    ("ss", "ss"),
    ("s", ""),
];

/// Shortest stem a suffix rule may leave behind.
const MIN_STEM: usize = 3;

/// Lightweight English backend with no external model.
pub struct SimpleBackend {
    stop_words: HashSet<&'static str>,
}

impl SimpleBackend {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token.to_lowercase().as_str())
    }

    fn words(text: &str) -> Vec<String> {
        WORD.find_iter(text).map(|m| m.as_str().to_string()).collect()
    }

    /// Lowercase and strip the first matching suffix rule.
    pub fn stem_word(word: &str) -> String {
        let lower = word.to_lowercase();
        for (suffix, replacement) in SUFFIX_RULES {
            let Some(stem) = lower.strip_suffix(suffix) else {
                continue;
            };
            if stem.chars().count() < MIN_STEM {
                return lower;
            }
            let mut out = stem.to_string();
            if matches!(*suffix, "ing" | "ed") {
                undouble(&mut out);
            }
            out.push_str(replacement);
            return out;
        }
        lower
    }
}

impl Default for SimpleBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// "runn" -> "run", but keep "ll", "ss" and "zz" ("fall", "pass", "buzz").
fn undouble(stem: &mut String) {
    let mut tail = stem.chars().rev();
    if let (Some(last), Some(prev)) = (tail.next(), tail.next())
        && last == prev
        && last.is_ascii_alphabetic()
        && !matches!(last, 'a' | 'e' | 'i' | 'o' | 'u' | 'l' | 's' | 'z')
    {
        stem.pop();
    }
}

#[async_trait]
impl TextBackend for SimpleBackend {
    fn name(&self) -> &str {
        "simple"
    }

    async fn tokenize(&self, text: &str) -> Result<Vec<String>, OperationError> {
        Ok(TOKEN.find_iter(text).map(|m| m.as_str().to_string()).collect())
    }

    async fn sentencize(&self, text: &str) -> Result<Vec<String>, OperationError> {
        Ok(SENTENCE
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| s.chars().any(char::is_alphanumeric))
            .map(str::to_string)
            .collect())
    }

    async fn paragraphize(&self, text: &str) -> Result<Vec<String>, OperationError> {
        Ok(PARAGRAPH_BREAK
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn normalize_whitespace(&self, text: &str) -> Result<String, OperationError> {
        Ok(WHITESPACE.replace_all(text.trim(), " ").into_owned())
    }

    async fn word_count(&self, text: &str) -> Result<usize, OperationError> {
        Ok(WORD.find_iter(text).count())
    }

    async fn ngrams(&self, text: &str, n: usize) -> Result<Vec<Vec<String>>, OperationError> {
        if n == 0 {
            return Err(OperationError::InvalidInput {
                operation: "ngrams".into(),
                reason: "n must be at least 1".into(),
            });
        }
        Ok(Self::words(text).windows(n).map(<[String]>::to_vec).collect())
    }

    async fn stem(&self, tokens: &[String]) -> Result<Vec<String>, OperationError> {
        Ok(tokens.iter().map(|t| Self::stem_word(t)).collect())
    }

    async fn remove_stop_words(&self, tokens: &[String]) -> Result<Vec<String>, OperationError> {
        Ok(tokens
            .iter()
            .filter(|t| !self.is_stop_word(t))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_tokenize_words_and_punctuation() {
        let backend = SimpleBackend::new();
        let tokens = backend.tokenize("Hello, world! It's well-known.").await.unwrap();
        assert_eq!(tokens, strings(&["Hello", ",", "world", "!", "It's", "well-known", "."]));
    }

    #[tokio::test]
    async fn test_sentencize() {
        let backend = SimpleBackend::new();
        assert_eq!(backend.sentencize("a. b.").await.unwrap(), strings(&["a.", "b."]));
        assert_eq!(
            backend.sentencize("Wait... what?! No trailing stop").await.unwrap(),
            strings(&["Wait...", "what?!", "No trailing stop"])
        );
        assert!(backend.sentencize("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paragraphize() {
        let backend = SimpleBackend::new();
        let text = "First line.\nStill first.\n\n  \nSecond.\n \nThird.";
        assert_eq!(
            backend.paragraphize(text).await.unwrap(),
            strings(&["First line.\nStill first.", "Second.", "Third."])
        );
    }

    #[tokio::test]
    async fn test_normalize_whitespace_and_word_count() {
        let backend = SimpleBackend::new();
        assert_eq!(backend.normalize_whitespace("  a \t b\n\nc ").await.unwrap(), "a b c");
        assert_eq!(backend.word_count("One, two... three!").await.unwrap(), 3);
        assert_eq!(backend.word_count("").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ngrams() {
        let backend = SimpleBackend::new();
        let bigrams = backend.ngrams("the quick brown fox", 2).await.unwrap();
        assert_eq!(bigrams.len(), 3);
        assert_eq!(bigrams[1], strings(&["quick", "brown"]));
        assert!(backend.ngrams("solo", 2).await.unwrap().is_empty());
        assert!(matches!(
            backend.ngrams("x", 0).await,
            Err(OperationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_stem_word() {
        assert_eq!(SimpleBackend::stem_word("Running"), "run");
        assert_eq!(SimpleBackend::stem_word("jumps"), "jump");
        assert_eq!(SimpleBackend::stem_word("studies"), "study");
        assert_eq!(SimpleBackend::stem_word("connected"), "connect");
        assert_eq!(SimpleBackend::stem_word("classes"), "class");
        assert_eq!(SimpleBackend::stem_word("glass"), "glass");
        assert_eq!(SimpleBackend::stem_word("falling"), "fall");
        assert_eq!(SimpleBackend::stem_word("relational"), "relate");
        // Too short to strip.
        assert_eq!(SimpleBackend::stem_word("is"), "is");
        assert_eq!(SimpleBackend::stem_word("bed"), "bed");
    }

    #[tokio::test]
    async fn test_remove_stop_words_case_insensitive() {
        let backend = SimpleBackend::new();
        let kept = backend
            .remove_stop_words(&strings(&["The", "cat", "sat", "on", "the", "mat"]))
            .await
            .unwrap();
        assert_eq!(kept, strings(&["cat", "sat", "mat"]));
    }

    #[tokio::test]
    async fn test_model_capabilities_unsupported() {
        let backend = SimpleBackend::new();
        match backend.pos_tag("text").await.unwrap_err() {
            OperationError::BackendNotSupported { backend, operation } => {
                assert_eq!(backend, "simple");
                assert_eq!(operation, "pos_tag");
            }
            other => panic!("Expected BackendNotSupported, got {other:?}"),
        }
        assert!(backend.lemmatize("text").await.is_err());
        assert!(backend.extract_entities("text").await.is_err());
    }
}
