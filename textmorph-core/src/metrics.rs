//! Execution metrics: per-node and per-call counters.
//!
//! `ExecutionMetrics` is a monoid: `empty()` is the identity and `combine`
//! is a pointwise (saturating) sum, so per-node metrics can be folded in any
//! grouping and yield the same totals.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;
use std::time::Duration;

/// Counters for one executor call or one node application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub duration: Duration,
    pub nodes_processed: u64,
    pub nodes_created: u64,
    pub tokens_consumed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl ExecutionMetrics {
    /// The identity element.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pointwise sum of two metric sets.
    pub fn combine(&self, other: &ExecutionMetrics) -> ExecutionMetrics {
        ExecutionMetrics {
            duration: self.duration.saturating_add(other.duration),
            nodes_processed: self.nodes_processed.saturating_add(other.nodes_processed),
            nodes_created: self.nodes_created.saturating_add(other.nodes_created),
            tokens_consumed: self.tokens_consumed.saturating_add(other.tokens_consumed),
            cache_hits: self.cache_hits.saturating_add(other.cache_hits),
            cache_misses: self.cache_misses.saturating_add(other.cache_misses),
        }
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    /// Record a successful node outcome that produced `created` children.
    pub fn record_processed(&mut self, created: usize) {
        self.nodes_processed += 1;
        self.nodes_created += created as u64;
    }

    pub fn record_tokens(&mut self, tokens: u64) {
        self.tokens_consumed = self.tokens_consumed.saturating_add(tokens);
    }

    /// Cache hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl Add for ExecutionMetrics {
    type Output = ExecutionMetrics;

    fn add(self, rhs: ExecutionMetrics) -> ExecutionMetrics {
        self.combine(&rhs)
    }
}

impl Sum for ExecutionMetrics {
    fn sum<I: Iterator<Item = ExecutionMetrics>>(iter: I) -> Self {
        iter.fold(ExecutionMetrics::empty(), |acc, m| acc.combine(&m))
    }
}

impl std::fmt::Display for ExecutionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} created, {} tokens, {}/{} cache hit/miss in {}ms",
            self.nodes_processed,
            self.nodes_created,
            self.tokens_consumed,
            self.cache_hits,
            self.cache_misses,
            self.duration.as_millis()
        )
    }
}
