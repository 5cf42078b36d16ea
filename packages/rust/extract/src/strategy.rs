//! Field strategy trait and ordered strategy chains.
//!
//! Every field is recovered by a chain of independent strategies tried in a
//! fixed order; the first strategy that produces a value wins.

use crate::text::DocumentText;

/// A single heuristic that tries to recover one field from a document.
pub trait FieldStrategy: Send + Sync {
    /// Try to recover the field. `None` means "no opinion", never an error.
    fn find(&self, doc: &DocumentText) -> Option<String>;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

/// A value together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub value: String,
    pub strategy: String,
}

/// Holds strategies for one field in precedence order.
pub struct StrategyChain {
    strategies: Vec<Box<dyn FieldStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn FieldStrategy>>) -> Self {
        Self { strategies }
    }

    /// Run strategies in order and stop at the first success.
    pub fn first_match(&self, doc: &DocumentText) -> Option<Found> {
        self.strategies.iter().find_map(|s| {
            s.find(doc).map(|value| Found {
                value,
                strategy: s.name().to_string(),
            })
        })
    }

    /// Strategy names in precedence order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}
