//! Executor: applies one operation across the target nodes of a graph.
//!
//! Per target node the executor validates, consults the result store,
//! applies (bounded by the optional timeout) and stores the result. Every
//! per-node failure is recorded in the returned report; only invalid options
//! or a structural graph error abort the call. The caller's graph is never
//! modified: new nodes are returned for the caller to fold back in.

pub mod options;
pub mod result;

pub use options::{ExecutionOptions, NodeSelector, Strategy};
pub use result::{NodeOutcome, NodeStatus, NodeTrace, OperationResult};

use crate::cache::{ResultCache, ResultKey, ResultStore};
use crate::error::{ExecutionError, NodeError, OperationError};
use crate::graph::{Graph, Node};
use crate::metrics::ExecutionMetrics;
use crate::operation::Operation;
use chrono::Utc;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

/// Capacity of the outcome channel behind `execute_stream`.
const STREAM_BUFFER: usize = 64;

type SharedStore<B> = Arc<dyn ResultStore<OperationResult<B>>>;

/// Runs operations over graphs and owns the result store used for caching.
pub struct Executor<B> {
    store: SharedStore<B>,
}

impl<B> Clone for Executor<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<B> Default for Executor<B>
where
    B: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Executor<B>
where
    B: Clone + Send + Sync + 'static,
{
    /// An executor backed by a fresh in-memory [`ResultCache`].
    pub fn new() -> Self {
        Self::with_store(Arc::new(ResultCache::new()))
    }

    pub fn with_store(store: SharedStore<B>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore<B> {
        &self.store
    }

    /// Apply `operation` to the nodes selected by `options` and aggregate the outcomes.
    pub async fn execute<A>(
        &self,
        graph: &Graph<A>,
        operation: Arc<dyn Operation<A, B>>,
        options: &ExecutionOptions,
    ) -> Result<OperationResult<B>, ExecutionError>
    where
        A: Clone + Send + Sync + 'static,
    {
        options.strategy.validate()?;
        let targets = options.selector.select(graph)?;
        let execution_id = Uuid::new_v4();
        let started = Instant::now();
        let name = operation.name().to_string();

        info!(
            execution_id = %execution_id,
            operation = %name,
            strategy = %options.strategy,
            targets = targets.len(),
            cache = options.cache,
            "Executing operation"
        );

        let ctx = NodeContext::new(execution_id, operation, Arc::clone(&self.store), options);
        let outcomes = match options.strategy {
            Strategy::Sequential => run_sequential(targets, &ctx).await,
            Strategy::Parallel(concurrency) => run_concurrent(targets, concurrency, &ctx).await,
            Strategy::Batch(size) => run_batched(targets, size, &ctx).await,
            // Same node-at-a-time schedule as Sequential; callers wanting the
            // incremental view use `execute_stream`.
            Strategy::Streaming => {
                let expected = targets.len();
                let outcomes = stream_outcomes(targets, ctx, 1).collect::<Vec<_>>().await;
                if outcomes.len() != expected {
                    return Err(ExecutionError::Aborted {
                        message: format!(
                            "outcome stream closed after {} of {expected} nodes",
                            outcomes.len()
                        ),
                    });
                }
                outcomes
            }
        };

        let result = OperationResult::from_outcomes(execution_id, name, outcomes, started.elapsed(), options.trace);
        info!(
            execution_id = %execution_id,
            operation = %result.operation,
            processed = result.metrics.nodes_processed,
            created = result.metrics.nodes_created,
            errors = result.errors.len(),
            duration_ms = result.metrics.duration.as_millis() as u64,
            "Execution complete"
        );
        Ok(result)
    }

    /// Like [`Executor::execute`], but yields each node's outcome as soon as
    /// it (and every target before it) is finished. Outcomes arrive in target
    /// order; up to `options.strategy.width()` nodes run at once.
    ///
    /// Must be called from within a Tokio runtime. Dropping the stream stops
    /// the remaining work.
    pub fn execute_stream<A>(
        &self,
        graph: &Graph<A>,
        operation: Arc<dyn Operation<A, B>>,
        options: &ExecutionOptions,
    ) -> Result<ReceiverStream<NodeOutcome<B>>, ExecutionError>
    where
        A: Clone + Send + Sync + 'static,
    {
        options.strategy.validate()?;
        let targets = options.selector.select(graph)?;
        let execution_id = Uuid::new_v4();
        debug!(
            execution_id = %execution_id,
            operation = %operation.name(),
            targets = targets.len(),
            "Streaming operation"
        );
        let ctx = NodeContext::new(execution_id, operation, Arc::clone(&self.store), options);
        Ok(stream_outcomes(targets, ctx, options.strategy.width()))
    }
}

/// Everything a single node application needs, cheap to clone into tasks.
struct NodeContext<A, B> {
    execution_id: Uuid,
    operation: Arc<dyn Operation<A, B>>,
    store: SharedStore<B>,
    cache: bool,
    trace: bool,
    timeout: Option<Duration>,
}

impl<A, B> Clone for NodeContext<A, B> {
    fn clone(&self) -> Self {
        Self {
            execution_id: self.execution_id,
            operation: Arc::clone(&self.operation),
            store: Arc::clone(&self.store),
            cache: self.cache,
            trace: self.trace,
            timeout: self.timeout,
        }
    }
}

impl<A, B> NodeContext<A, B> {
    fn new(
        execution_id: Uuid,
        operation: Arc<dyn Operation<A, B>>,
        store: SharedStore<B>,
        options: &ExecutionOptions,
    ) -> Self {
        Self {
            execution_id,
            operation,
            store,
            cache: options.cache,
            trace: options.trace,
            timeout: options.timeout,
        }
    }
}

async fn run_sequential<A, B>(targets: Vec<Node<A>>, ctx: &NodeContext<A, B>) -> Vec<NodeOutcome<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let mut outcomes = Vec::with_capacity(targets.len());
    for node in targets {
        outcomes.push(run_node(node, ctx.clone()).await);
    }
    outcomes
}

/// One task per node, at most `concurrency` applying at once. Handles are
/// awaited in spawn order so outcomes keep target order.
async fn run_concurrent<A, B>(
    targets: Vec<Node<A>>,
    concurrency: usize,
    ctx: &NodeContext<A, B>,
) -> Vec<NodeOutcome<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(targets.len());

    for node in targets {
        let node_id = node.id;
        let sem = Arc::clone(&semaphore);
        let ctx = ctx.clone();
        let handle = tokio::spawn(async move {
            let _permit = sem.acquire_owned().await;
            run_node(node, ctx).await
        });
        handles.push((node_id, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (node_id, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!(node_id = %node_id, error = %e, "Node task did not complete");
                let source = OperationError::failed(ctx.operation.name(), format!("task failed: {e}"));
                outcomes.push(NodeOutcome::failed(
                    node_id,
                    NodeError::Operation { node_id, source },
                    ExecutionMetrics::empty(),
                ));
            }
        }
    }
    outcomes
}

/// Consecutive chunks of `size`, each run fully concurrently, one chunk at a time.
async fn run_batched<A, B>(targets: Vec<Node<A>>, size: usize, ctx: &NodeContext<A, B>) -> Vec<NodeOutcome<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let mut outcomes = Vec::with_capacity(targets.len());
    let mut remaining = targets.into_iter().peekable();
    let mut batch = 0usize;
    while remaining.peek().is_some() {
        let chunk: Vec<Node<A>> = remaining.by_ref().take(size).collect();
        debug!(batch, size = chunk.len(), "Running batch");
        let width = chunk.len();
        outcomes.extend(run_concurrent(chunk, width, ctx).await);
        batch += 1;
    }
    outcomes
}

fn stream_outcomes<A, B>(targets: Vec<Node<A>>, ctx: NodeContext<A, B>, width: usize) -> ReceiverStream<NodeOutcome<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(async move {
        let mut outcomes = futures::stream::iter(targets)
            .map(|node| run_node(node, ctx.clone()))
            .buffered(width.max(1));
        while let Some(outcome) = outcomes.next().await {
            if tx.send(outcome).await.is_err() {
                debug!(execution_id = %ctx.execution_id, "Outcome receiver dropped, stopping stream");
                break;
            }
        }
    });
    ReceiverStream::new(rx)
}

/// Apply to one node, isolating panics and timing the whole attempt.
async fn run_node<A, B>(node: Node<A>, ctx: NodeContext<A, B>) -> NodeOutcome<B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let node_id = node.id;
    let span = if ctx.trace {
        info_span!(
            "apply_node",
            execution_id = %ctx.execution_id,
            operation = %ctx.operation.name(),
            node_id = %node_id
        )
    } else {
        Span::none()
    };

    let started = Instant::now();
    let attempt = AssertUnwindSafe(process_node(node, &ctx))
        .catch_unwind()
        .instrument(span)
        .await;

    let mut outcome = attempt.unwrap_or_else(|panic| {
        let message = panic_message(panic.as_ref());
        warn!(operation = %ctx.operation.name(), node_id = %node_id, panic = %message, "Operation panicked");
        let source = OperationError::failed(ctx.operation.name(), format!("panicked: {message}"));
        NodeOutcome::failed(node_id, NodeError::Operation { node_id, source }, ExecutionMetrics::empty())
    });
    outcome.metrics.duration = started.elapsed();
    outcome
}

async fn process_node<A, B>(node: Node<A>, ctx: &NodeContext<A, B>) -> NodeOutcome<B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let operation = ctx.operation.name();
    let node_id = node.id;
    let mut metrics = ExecutionMetrics::empty();

    let validation = ctx.operation.validate(&node);
    for warning in &validation.warnings {
        debug!(operation, node_id = %node_id, warning = %warning, "Validation warning");
    }
    if !validation.valid {
        debug!(operation, node_id = %node_id, errors = ?validation.errors, "Validation failed, skipping node");
        let error = NodeError::Validation {
            node_id,
            operation: operation.to_string(),
            errors: validation.errors,
        };
        return NodeOutcome::failed(node_id, error, metrics);
    }

    let key = ResultKey::new(operation, node_id);
    if ctx.cache {
        match ctx.store.get(&key) {
            Ok(Some(entry)) => {
                metrics.record_cache_hit();
                metrics.record_processed(entry.result.new_nodes.len());
                debug!(operation, node_id = %node_id, hits = entry.hits, "Cache hit");
                return NodeOutcome {
                    node_id,
                    new_nodes: entry.result.new_nodes,
                    error: None,
                    metrics,
                    cache_hit: true,
                };
            }
            Ok(None) => metrics.record_cache_miss(),
            Err(e) => {
                warn!(operation, node_id = %node_id, error = %e, "Result store lookup failed, applying uncached");
                metrics.record_cache_miss();
            }
        }
    }

    let cost = ctx.operation.estimate_cost(&node);
    let applied = match ctx.timeout {
        Some(limit) => match tokio::time::timeout(limit, ctx.operation.apply(&node)).await {
            Ok(applied) => applied,
            Err(_) => {
                warn!(operation, node_id = %node_id, timeout_ms = limit.as_millis() as u64, "Operation timed out");
                let error = NodeError::Timeout {
                    node_id,
                    operation: operation.to_string(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                };
                return NodeOutcome::failed(node_id, error, metrics);
            }
        },
        None => ctx.operation.apply(&node).await,
    };

    match applied {
        Ok(children) => {
            metrics.record_processed(children.len());
            metrics.record_tokens(cost.token_cost);
            if ctx.cache {
                let cached = OperationResult {
                    execution_id: ctx.execution_id,
                    operation: operation.to_string(),
                    new_nodes: children.clone(),
                    errors: Vec::new(),
                    metrics,
                    timestamp: Utc::now(),
                    trace: Vec::new(),
                };
                if let Err(e) = ctx.store.store(key, cached) {
                    warn!(operation, node_id = %node_id, error = %e, "Failed to store result");
                }
            }
            NodeOutcome {
                node_id,
                new_nodes: children,
                error: None,
                metrics,
                cache_hit: false,
            }
        }
        Err(source) => {
            debug!(operation, node_id = %node_id, error = %source, "Operation failed");
            NodeOutcome::failed(node_id, NodeError::Operation { node_id, source }, metrics)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
