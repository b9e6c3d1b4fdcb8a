//! Per-engine evaluation state
//!
//! One context per engine, and so per workbook. It holds the in-flight
//! stack used for cycle detection, computed results, parsed formulas and
//! the reverse-dependency index built from them.

use ahash::{AHashMap, AHashSet};
use log::trace;
use sheetcalc_core::{CellId, Value, Workbook};
use sheetcalc_formula::{resolve, DependencyGraph, Expr};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct EvaluationContext {
    results: AHashMap<CellId, Value>,
    formulas: AHashMap<CellId, Arc<Expr>>,
    dependencies: DependencyGraph,
    in_flight: Vec<CellId>,
    in_flight_set: AHashSet<CellId>,
    /// In-flight cells found to sit on a reference cycle
    cyclic: AHashSet<CellId>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    // === Results ===

    /// Computed result of a formula cell, if still valid
    pub fn cached(&self, cell: CellId) -> Option<&Value> {
        self.results.get(&cell)
    }

    pub(crate) fn store(&mut self, cell: CellId, value: Value) {
        self.results.insert(cell, value);
    }

    pub(crate) fn forget_result(&mut self, cell: CellId) -> bool {
        self.results.remove(&cell).is_some()
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    // === Parsed formulas ===

    pub(crate) fn parsed(&self, cell: CellId) -> Option<Arc<Expr>> {
        self.formulas.get(&cell).cloned()
    }

    /// Keep a parsed formula and index the cells it references
    ///
    /// References that do not resolve right now (a missing sheet, say) are
    /// left out; structural edits clear the whole index anyway.
    pub(crate) fn insert_parsed(&mut self, cell: CellId, expr: Arc<Expr>, workbook: &Workbook) {
        self.dependencies.clear_dependencies(cell);
        for token in expr.references() {
            match resolve(token, cell.sheet, workbook) {
                Ok(resolved) => self.dependencies.add_resolved(resolved, cell),
                Err(e) => trace!("not indexing reference of {}: {}", cell, e),
            }
        }
        self.formulas.insert(cell, expr);
    }

    /// Drop everything known about a cell's formula: result, tree and references
    pub(crate) fn forget_formula(&mut self, cell: CellId) {
        self.results.remove(&cell);
        self.formulas.remove(&cell);
        self.dependencies.clear_dependencies(cell);
    }

    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    // === In-flight stack ===

    /// Number of formula cells currently being evaluated
    pub fn depth(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn is_in_flight(&self, cell: CellId) -> bool {
        self.in_flight_set.contains(&cell)
    }

    pub(crate) fn push(&mut self, cell: CellId) {
        self.in_flight.push(cell);
        self.in_flight_set.insert(cell);
    }

    pub(crate) fn pop(&mut self, cell: CellId) {
        if self.in_flight.last() == Some(&cell) {
            self.in_flight.pop();
            self.in_flight_set.remove(&cell);
        }
    }

    /// Mark every in-flight cell from `cell` upward as a cycle member
    ///
    /// Returns how many cells the cycle spans.
    pub(crate) fn mark_cycle(&mut self, cell: CellId) -> usize {
        match self.in_flight.iter().rposition(|&c| c == cell) {
            Some(start) => {
                let members = &self.in_flight[start..];
                self.cyclic.extend(members.iter().copied());
                members.len()
            }
            None => 0,
        }
    }

    /// Whether `cell` was marked as a cycle member; clears the mark
    pub(crate) fn take_cyclic(&mut self, cell: CellId) -> bool {
        self.cyclic.remove(&cell)
    }

    /// Reset the in-flight state after an evaluation aborted with an error
    pub(crate) fn abandon(&mut self) {
        self.in_flight.clear();
        self.in_flight_set.clear();
        self.cyclic.clear();
    }

    /// Forget every result, parsed formula and dependency
    pub(crate) fn clear(&mut self) {
        self.results.clear();
        self.formulas.clear();
        self.dependencies.clear();
        self.abandon();
    }
}
