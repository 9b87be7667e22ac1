//! Text operations driven through the executor.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use textmorph_core::{
    ExecutionOptions, Executor, Graph, Node, NodeError, NodeSelector, OperationError, Strategy,
};
use textmorph_ops::{SimpleBackend, TextBackend, text_catalog};

/// Sentencizes everything as `["a.", "b."]` and counts calls.
struct StubBackend {
    sentencize_calls: AtomicUsize,
}

#[async_trait]
impl TextBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn tokenize(&self, text: &str) -> Result<Vec<String>, OperationError> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    async fn sentencize(&self, _text: &str) -> Result<Vec<String>, OperationError> {
        self.sentencize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["a.".into(), "b.".into()])
    }

    async fn paragraphize(&self, text: &str) -> Result<Vec<String>, OperationError> {
        Ok(vec![text.to_string()])
    }

    async fn normalize_whitespace(&self, text: &str) -> Result<String, OperationError> {
        Ok(text.to_string())
    }

    async fn word_count(&self, text: &str) -> Result<usize, OperationError> {
        Ok(text.split_whitespace().count())
    }

    async fn ngrams(&self, _text: &str, _n: usize) -> Result<Vec<Vec<String>>, OperationError> {
        Ok(Vec::new())
    }

    async fn stem(&self, tokens: &[String]) -> Result<Vec<String>, OperationError> {
        Ok(tokens.to_vec())
    }

    async fn remove_stop_words(&self, tokens: &[String]) -> Result<Vec<String>, OperationError> {
        Ok(tokens.to_vec())
    }
}

fn texts(nodes: &[Node<String>]) -> Vec<&str> {
    nodes.iter().map(|n| n.data.as_str()).collect()
}

#[tokio::test]
async fn test_sentencize_with_stub_backend() {
    let backend = Arc::new(StubBackend {
        sentencize_calls: AtomicUsize::new(0),
    });
    let catalog = text_catalog(backend.clone()).unwrap();
    let sentencize = catalog.require("sentencize").unwrap();

    let graph = Graph::singleton("a. b.".to_string());
    let root_id = graph.root_ids()[0];
    let result = Executor::new()
        .execute(&graph, sentencize, &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(result.new_nodes.len(), 2);
    assert_eq!(texts(&result.new_nodes), vec!["a.", "b."]);
    assert!(result.new_nodes.iter().all(|n| n.parent == Some(root_id)));
    assert_eq!(backend.sentencize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_document_pipeline_with_simple_backend() {
    let catalog = text_catalog(Arc::new(SimpleBackend::new())).unwrap();
    let executor = Executor::new();
    let doc = "The cat sat. The dog ran!\n\nBirds fly south.";
    let graph = Graph::singleton(doc.to_string());

    let paragraphs = executor
        .execute(&graph, catalog.require("paragraphize").unwrap(), &ExecutionOptions::default())
        .await
        .unwrap();
    let graph = paragraphs.fold_into(&graph).unwrap();
    assert_eq!(texts(&paragraphs.new_nodes), vec!["The cat sat. The dog ran!", "Birds fly south."]);

    let sentences = executor
        .execute(
            &graph,
            catalog.require("sentencize").unwrap(),
            &ExecutionOptions::new(Strategy::Parallel(2)).with_selector(NodeSelector::Depth(1)),
        )
        .await
        .unwrap();
    let graph = sentences.fold_into(&graph).unwrap();
    assert_eq!(
        texts(&sentences.new_nodes),
        vec!["The cat sat.", "The dog ran!", "Birds fly south."]
    );

    let tokens = executor
        .execute(
            &graph,
            catalog.require("tokenize").unwrap(),
            &ExecutionOptions::new(Strategy::Batch(2)).with_selector(NodeSelector::Depth(2)),
        )
        .await
        .unwrap();
    let graph = tokens.fold_into(&graph).unwrap();

    assert!(tokens.is_success());
    assert_eq!(tokens.new_nodes.len(), 12);
    assert_eq!(graph.len(), 1 + 2 + 3 + 12);
    assert_eq!(graph.leaves().len(), 12);
    assert!(tokens.new_nodes.iter().all(|n| n.depth() == 3));
    assert!(tokens.metrics.tokens_consumed > 0);

    let word_counts = graph
        .fold(|node, children: Vec<usize>| {
            if children.is_empty() && node.data.chars().all(char::is_alphanumeric) {
                1
            } else {
                children.iter().sum()
            }
        })
        .unwrap();
    assert_eq!(word_counts, vec![9]);
}

#[tokio::test]
async fn test_unsupported_capability_recorded_per_node() {
    let catalog = text_catalog(Arc::new(SimpleBackend::new())).unwrap();
    let graph = Graph::singleton("one".to_string())
        .add_node(Node::root("two".to_string()))
        .unwrap();

    let result = Executor::new()
        .execute(
            &graph,
            catalog.require("pos_tag").unwrap(),
            &ExecutionOptions::new(Strategy::Parallel(2)),
        )
        .await
        .unwrap();

    assert!(result.new_nodes.is_empty());
    assert_eq!(result.errors.len(), 2);
    for error in &result.errors {
        assert!(matches!(
            error,
            NodeError::Operation {
                source: OperationError::BackendNotSupported { .. },
                ..
            }
        ));
    }
    assert_eq!(result.metrics.nodes_processed, 0);
}

#[tokio::test]
async fn test_blank_text_is_skipped() {
    let catalog = text_catalog(Arc::new(SimpleBackend::new())).unwrap();
    let graph = Graph::singleton("alpha beta".to_string());
    let root = graph.root_ids()[0];
    let graph = graph
        .add_nodes(vec![
            Node::with_parent("gamma".to_string(), Some(root)),
            Node::with_parent("   ".to_string(), Some(root)),
        ])
        .unwrap();

    let result = Executor::new()
        .execute(&graph, catalog.require("word_count").unwrap(), &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(texts(&result.new_nodes), vec!["2", "1"]);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].is_validation());
}

#[tokio::test]
async fn test_cached_stem_reuses_results() {
    let catalog = text_catalog(Arc::new(SimpleBackend::new())).unwrap();
    let graph = Graph::singleton("jumping foxes".to_string());
    let executor = Executor::new();
    let options = ExecutionOptions::default().with_cache(true);

    let first = executor
        .execute(&graph, catalog.require("stem").unwrap(), &options)
        .await
        .unwrap();
    let second = executor
        .execute(&graph, catalog.require("stem").unwrap(), &options)
        .await
        .unwrap();

    assert_eq!(texts(&first.new_nodes), vec!["jump", "foxe"]);
    assert_eq!(second.metrics.cache_hits, 1);
    assert_eq!(second.new_nodes, first.new_nodes);
}
