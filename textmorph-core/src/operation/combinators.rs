//! Construction helpers for operations.
//!
//! `transform`, `expand` and `filter` wrap plain closures, which run on the
//! blocking thread pool so a per-node timeout can fire while they work. The
//! `_async` variants wrap effectful closures returning futures. `identity` and
//! `compose` give operations a sequential composition with a neutral
//! element: composing with `identity` on either side produces the same
//! nodes as the operation alone.

use crate::error::OperationError;
use crate::graph::Node;
use crate::operation::{Operation, OperationCategory, OperationCost, ValidationResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

type ApplyFn<A, B> = Arc<dyn Fn(&A) -> Result<Vec<B>, String> + Send + Sync>;
type AsyncApplyFn<A, B> = Box<dyn Fn(A) -> BoxFuture<'static, Result<Vec<B>, OperationError>> + Send + Sync>;
type ValidateFn<A> = Box<dyn Fn(&A) -> ValidationResult + Send + Sync>;
type CostFn<A> = Box<dyn Fn(&A) -> OperationCost + Send + Sync>;

enum Body<A, B> {
    Sync(ApplyFn<A, B>),
    Async(AsyncApplyFn<A, B>),
}

/// An operation backed by closures over the node payload.
pub struct FnOperation<A, B> {
    name: String,
    description: String,
    category: OperationCategory,
    body: Body<A, B>,
    validator: Option<ValidateFn<A>>,
    cost: Option<CostFn<A>>,
}

impl<A, B> FnOperation<A, B> {
    fn new(name: impl Into<String>, category: OperationCategory, body: Body<A, B>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            category,
            body,
            validator: None,
            cost: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: OperationCategory) -> Self {
        self.category = category;
        self
    }

    /// Attach a payload validator consulted before `apply`.
    pub fn with_validator(mut self, validator: impl Fn(&A) -> ValidationResult + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_cost(mut self, cost: impl Fn(&A) -> OperationCost + Send + Sync + 'static) -> Self {
        self.cost = Some(Box::new(cost));
        self
    }
}

#[async_trait]
impl<A, B> Operation<A, B> for FnOperation<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> OperationCategory {
        self.category
    }

    fn validate(&self, node: &Node<A>) -> ValidationResult {
        self.validator
            .as_ref()
            .map_or_else(ValidationResult::ok, |validate| validate(&node.data))
    }

    fn estimate_cost(&self, node: &Node<A>) -> OperationCost {
        self.cost
            .as_ref()
            .map_or_else(OperationCost::zero, |cost| cost(&node.data))
    }

    async fn apply(&self, node: &Node<A>) -> Result<Vec<Node<B>>, OperationError> {
        let outputs = match &self.body {
            Body::Sync(f) => {
                let f = Arc::clone(f);
                let data = node.data.clone();
                match tokio::task::spawn_blocking(move || f(&data)).await {
                    Ok(result) => result.map_err(|message| OperationError::failed(&self.name, message))?,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => {
                        return Err(OperationError::failed(&self.name, format!("blocking task failed: {e}")));
                    }
                }
            }
            Body::Async(f) => f(node.data.clone()).await?,
        };
        Ok(outputs
            .into_iter()
            .map(|data| Node::child(node, data, &self.name))
            .collect())
    }
}

/// One node to exactly one child.
pub fn transform<A, B, F>(name: impl Into<String>, f: F) -> FnOperation<A, B>
where
    A: 'static,
    B: 'static,
    F: Fn(&A) -> B + Send + Sync + 'static,
{
    FnOperation::new(
        name,
        OperationCategory::Transformation,
        Body::Sync(Arc::new(move |a: &A| Ok(vec![f(a)]))),
    )
}

/// One node to a list of children.
pub fn expand<A, B, F>(name: impl Into<String>, f: F) -> FnOperation<A, B>
where
    A: 'static,
    B: 'static,
    F: Fn(&A) -> Vec<B> + Send + Sync + 'static,
{
    FnOperation::new(
        name,
        OperationCategory::Expansion,
        Body::Sync(Arc::new(move |a: &A| Ok(f(a)))),
    )
}

/// Like [`expand`], but the closure may fail; the message becomes an
/// [`OperationError::Failed`].
pub fn try_expand<A, B, F>(name: impl Into<String>, f: F) -> FnOperation<A, B>
where
    A: 'static,
    B: 'static,
    F: Fn(&A) -> Result<Vec<B>, String> + Send + Sync + 'static,
{
    FnOperation::new(name, OperationCategory::Expansion, Body::Sync(Arc::new(f)))
}

/// Zero or one child holding a copy of the payload, depending on `predicate`.
pub fn filter<A, F>(name: impl Into<String>, predicate: F) -> FnOperation<A, A>
where
    A: Clone + 'static,
    F: Fn(&A) -> bool + Send + Sync + 'static,
{
    FnOperation::new(
        name,
        OperationCategory::Filtering,
        Body::Sync(Arc::new(move |a: &A| {
            Ok(if predicate(a) { vec![a.clone()] } else { Vec::new() })
        })),
    )
}

/// Effectful one-to-one operation.
pub fn transform_async<A, B, F, Fut>(name: impl Into<String>, f: F) -> FnOperation<A, B>
where
    A: 'static,
    B: 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, OperationError>> + Send + 'static,
{
    FnOperation::new(
        name,
        OperationCategory::Transformation,
        Body::Async(Box::new(move |a: A| {
            let fut = f(a);
            Box::pin(async move { fut.await.map(|b| vec![b]) }) as BoxFuture<'static, _>
        })),
    )
}

/// Effectful one-to-many operation.
pub fn expand_async<A, B, F, Fut>(name: impl Into<String>, f: F) -> FnOperation<A, B>
where
    A: 'static,
    B: 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<B>, OperationError>> + Send + 'static,
{
    FnOperation::new(
        name,
        OperationCategory::Expansion,
        Body::Async(Box::new(move |a: A| Box::pin(f(a)) as BoxFuture<'static, _>)),
    )
}

/// The neutral element of [`compose`]: returns its input node unchanged.
pub struct Identity;

pub fn identity() -> Identity {
    Identity
}

#[async_trait]
impl<A> Operation<A, A> for Identity
where
    A: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "identity"
    }

    fn description(&self) -> &str {
        "Returns the input node unchanged"
    }

    fn category(&self) -> OperationCategory {
        OperationCategory::Transformation
    }

    async fn apply(&self, node: &Node<A>) -> Result<Vec<Node<A>>, OperationError> {
        Ok(vec![node.clone()])
    }
}

/// Sequential composition of two operations.
struct Composed<A, B> {
    name: String,
    description: String,
    first: Arc<dyn Operation<A, B>>,
    second: Arc<dyn Operation<B, B>>,
}

/// Chain `first` then `second`.
///
/// The result contains each intermediate node followed by the nodes
/// `second` produced from it, so the intermediates are parents of the final
/// level and the output can be folded into a graph in order. A node that an
/// operation passes through unchanged (same id as its input) is not emitted
/// again, which makes `identity` neutral on both sides.
pub fn compose<A, B>(first: Arc<dyn Operation<A, B>>, second: Arc<dyn Operation<B, B>>) -> Arc<dyn Operation<A, B>>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    let name = format!("{}>>{}", first.name(), second.name());
    let description = format!("{}, then {}", first.description(), second.description());
    Arc::new(Composed {
        name,
        description,
        first,
        second,
    })
}

#[async_trait]
impl<A, B> Operation<A, B> for Composed<A, B>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> OperationCategory {
        OperationCategory::Composition
    }

    fn validate(&self, node: &Node<A>) -> ValidationResult {
        self.first.validate(node)
    }

    // The second stage's cost depends on the first stage's output, which is
    // unknown until apply.
    fn estimate_cost(&self, node: &Node<A>) -> OperationCost {
        self.first.estimate_cost(node)
    }

    async fn apply(&self, node: &Node<A>) -> Result<Vec<Node<B>>, OperationError> {
        let intermediates = self.first.apply(node).await?;
        let mut out = Vec::with_capacity(intermediates.len());

        for mid in intermediates {
            let check = self.second.validate(&mid);
            if !check.valid {
                return Err(OperationError::InvalidInput {
                    operation: self.second.name().to_string(),
                    reason: check.errors.join("; "),
                });
            }
            let finals = self.second.apply(&mid).await?;
            let mid_id = mid.id;
            if mid_id != node.id {
                out.push(mid);
            }
            out.extend(finals.into_iter().filter(|n| n.id != mid_id));
        }
        Ok(out)
    }
}
