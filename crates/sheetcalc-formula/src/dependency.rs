//! Dependency tracking for cache invalidation
//!
//! A reverse index from referenced cells to the formula cells that
//! reference them. Single-cell references are stored as edges; range
//! references are kept whole and matched by containment, so a formula over
//! `A1:A100000` costs one entry rather than one per cell.

use crate::resolver::{Resolved, ResolvedRange};
use ahash::{AHashMap, AHashSet};
use sheetcalc_core::CellId;
use std::collections::VecDeque;

/// Dependency graph for formula cells
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Cell → formula cells that reference it directly
    dependents: AHashMap<CellId, AHashSet<CellId>>,
    /// Formula cell → cells it references directly
    precedents: AHashMap<CellId, AHashSet<CellId>>,
    /// Formula cell → ranges it references
    ranges: AHashMap<CellId, Vec<ResolvedRange>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: CellId, dependent: CellId) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Add a dependency on every cell of a range
    pub fn add_range_dependency(&mut self, range: ResolvedRange, dependent: CellId) {
        if let [sheet] = range.sheets() {
            if range.range().is_single_cell() {
                let start = range.range().start;
                self.add_dependency(CellId::new(*sheet, start.row, start.col), dependent);
                return;
            }
        }
        self.ranges.entry(dependent).or_default().push(range);
    }

    /// Record a resolved reference of `dependent`
    pub fn add_resolved(&mut self, resolved: Resolved, dependent: CellId) {
        match resolved {
            Resolved::Cell(precedent) => self.add_dependency(precedent, dependent),
            Resolved::Range(range) => self.add_range_dependency(range, dependent),
        }
    }

    /// Forget everything `cell` depends on
    ///
    /// Formula cells that reference `cell` keep their edges.
    pub fn clear_dependencies(&mut self, cell: CellId) {
        if let Some(precedents) = self.precedents.remove(&cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }
        self.ranges.remove(&cell);
    }

    /// Formula cells that reference `cell` directly, through a cell or a range
    pub fn get_dependents(&self, cell: CellId) -> Vec<CellId> {
        let mut found: Vec<CellId> = self
            .dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
            .collect();
        found.extend(
            self.ranges
                .iter()
                .filter(|(_, ranges)| ranges.iter().any(|r| r.contains(cell)))
                .map(|(&dependent, _)| dependent),
        );
        found
    }

    /// Cells that `cell` references directly (ranges excluded)
    pub fn get_precedents(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Everything that transitively depends on any of `changed`
    ///
    /// Breadth-first with a visited set, so cycles terminate. A changed cell
    /// only appears in the result when it depends on itself through a cycle.
    pub fn transitive_dependents(&self, changed: &[CellId]) -> Vec<CellId> {
        let mut result = Vec::new();
        let mut visited = AHashSet::new();
        let mut queue: VecDeque<CellId> = changed.iter().copied().collect();

        while let Some(cell) = queue.pop_front() {
            for dependent in self.get_dependents(cell) {
                if visited.insert(dependent) {
                    result.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }

        result
    }

    /// Whether `cell` has any registered references
    pub fn has_precedents(&self, cell: CellId) -> bool {
        self.precedents.contains_key(&cell) || self.ranges.contains_key(&cell)
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
        self.ranges.clear();
    }
}
