//! Engine configuration

pub use sheetcalc_formula::ComparisonOrder;

/// How edits invalidate cached results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvalidationPolicy {
    /// Invalidate the edited cell's transitive dependents only
    #[default]
    Dependents,
    /// Throw away every cached result on every edit
    ClearAll,
}

/// Options for the evaluation engine
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EngineOptions {
    /// Invalidation strategy (default: dependents only)
    pub invalidation: InvalidationPolicy,
    /// Ordering of mixed-type comparisons (default: ranked)
    pub comparison: ComparisonOrder,
    /// Maximum number of formula cells in flight at once (default: 256)
    pub max_depth: usize,
    /// Compute a cell's precedents bottom-up before the cell itself (default: true)
    pub prefetch_dependencies: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            invalidation: InvalidationPolicy::default(),
            comparison: ComparisonOrder::default(),
            max_depth: 256,
            prefetch_dependencies: true,
        }
    }
}

impl EngineOptions {
    pub fn with_invalidation(mut self, invalidation: InvalidationPolicy) -> Self {
        self.invalidation = invalidation;
        self
    }

    pub fn with_comparison(mut self, comparison: ComparisonOrder) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch_dependencies = prefetch;
        self
    }
}
