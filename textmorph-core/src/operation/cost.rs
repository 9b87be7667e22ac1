//! Cost estimates for operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Asymptotic growth of an operation relative to its input size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComplexityClass {
    #[default]
    #[serde(rename = "O(1)")]
    Constant,
    #[serde(rename = "O(n)")]
    Linear,
    #[serde(rename = "O(n log n)")]
    Linearithmic,
    #[serde(rename = "O(n^2)")]
    Quadratic,
}

impl ComplexityClass {
    /// Multiplier applied when scaling a unit cost to `n` inputs.
    pub fn factor(&self, n: usize) -> f64 {
        let n = n as f64;
        match self {
            ComplexityClass::Constant => 1.0,
            ComplexityClass::Linear => n,
            ComplexityClass::Linearithmic => {
                if n < 2.0 {
                    1.0
                } else {
                    n * n.log2()
                }
            }
            ComplexityClass::Quadratic => n * n,
        }
    }
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityClass::Constant => write!(f, "O(1)"),
            ComplexityClass::Linear => write!(f, "O(n)"),
            ComplexityClass::Linearithmic => write!(f, "O(n log n)"),
            ComplexityClass::Quadratic => write!(f, "O(n^2)"),
        }
    }
}

/// Estimated resources needed to apply an operation to one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationCost {
    pub estimated_time: Duration,
    pub token_cost: u64,
    /// Bytes.
    pub memory_cost: u64,
    pub complexity: ComplexityClass,
}

impl OperationCost {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(estimated_time: Duration, token_cost: u64, memory_cost: u64, complexity: ComplexityClass) -> Self {
        Self {
            estimated_time,
            token_cost,
            memory_cost,
            complexity,
        }
    }

    /// Scale time, tokens and memory by the complexity factor for `n` inputs.
    pub fn scale(&self, n: usize) -> OperationCost {
        let factor = self.complexity.factor(n);
        OperationCost {
            estimated_time: scale_duration(self.estimated_time, factor),
            token_cost: (self.token_cost as f64 * factor).round() as u64,
            memory_cost: (self.memory_cost as f64 * factor).round() as u64,
            complexity: self.complexity,
        }
    }

    /// Sum of two costs; the complexity is the worse of the two.
    pub fn combine(&self, other: &OperationCost) -> OperationCost {
        OperationCost {
            estimated_time: self.estimated_time.saturating_add(other.estimated_time),
            token_cost: self.token_cost.saturating_add(other.token_cost),
            memory_cost: self.memory_cost.saturating_add(other.memory_cost),
            complexity: self.complexity.max(other.complexity),
        }
    }
}

/// Scales in whole nanoseconds so a factor of 1 is exact; saturates at `u64::MAX` ns.
fn scale_duration(duration: Duration, factor: f64) -> Duration {
    let nanos = (duration.as_nanos() as f64 * factor).round();
    if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}
