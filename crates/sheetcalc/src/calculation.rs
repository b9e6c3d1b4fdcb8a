//! Whole-workbook evaluation
//!
//! Computes every formula cell once and stores each result in its cell.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value("A2", 20.0).unwrap();
//! sheet.set_cell_formula("A3", "=A1+A2").unwrap();
//!
//! let stats = workbook.evaluate_all_formula_cells().unwrap();
//! assert_eq!(stats.formula_count, 1);
//! assert_eq!(
//!     workbook.sheet(0).unwrap().cell("A3").unwrap().unwrap().cached_value(),
//!     Some(&Value::Number(30.0))
//! );
//! ```

use crate::engine::Engine;
use crate::options::EngineOptions;
use log::{debug, warn};
use sheetcalc_core::{CellId, Error, ErrorCode, Result, Value, Workbook};
use std::mem;

/// Counters from one bulk evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Formula cells found in the workbook
    pub formula_count: usize,
    /// Formula cells whose result was stored
    pub cells_evaluated: usize,
    /// Formula cells already computed when their turn came
    pub cache_hits: usize,
    /// Formula cells that evaluated to `#CIRCULAR!`
    pub circular_references: usize,
    /// Formula cells left unevaluated because their text does not parse
    /// or their evaluation nests deeper than the depth limit
    pub errors: usize,
}

impl Engine {
    /// Compute and store the result of every formula cell
    ///
    /// Cells are visited sheet by sheet in row-major order. Results cached
    /// along the way are reused, so each cell is computed at most once.
    /// A formula that does not parse, or that nests deeper than the depth
    /// limit, is reported and skipped; any other failure stops the run.
    pub fn evaluate_all_formula_cells(&mut self) -> Result<EvaluationStats> {
        let cells: Vec<CellId> = self
            .workbook
            .sheets()
            .flat_map(|sheet| {
                let id = sheet.id();
                sheet
                    .formula_cells()
                    .map(move |(row, col, _)| CellId::new(id, row, col))
            })
            .collect();

        let mut stats = EvaluationStats {
            formula_count: cells.len(),
            ..Default::default()
        };
        debug!("evaluating {} formula cells", stats.formula_count);

        for cell in cells {
            if self.is_cached(cell) {
                stats.cache_hits += 1;
            }
            match self.evaluate_and_store(cell) {
                Ok(_) => {
                    stats.cells_evaluated += 1;
                    if self.context.cached(cell)
                        == Some(&Value::Error(ErrorCode::CircularReference))
                    {
                        stats.circular_references += 1;
                    }
                }
                Err(Error::FormulaParse(message)) => {
                    warn!("skipping {}: {}", cell, message);
                    stats.errors += 1;
                }
                Err(e @ Error::RecursionLimit(_)) => {
                    warn!("skipping {}: {}", cell, e);
                    stats.errors += 1;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "evaluated {} cells, {} cache hits, {} circular",
            stats.cells_evaluated, stats.cache_hits, stats.circular_references
        );
        Ok(stats)
    }
}

/// Bulk evaluation directly on a [`Workbook`]
pub trait WorkbookCalculationExt {
    /// Evaluate every formula cell with default options
    fn evaluate_all_formula_cells(&mut self) -> Result<EvaluationStats>;

    fn evaluate_all_formula_cells_with_options(
        &mut self,
        options: EngineOptions,
    ) -> Result<EvaluationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn evaluate_all_formula_cells(&mut self) -> Result<EvaluationStats> {
        self.evaluate_all_formula_cells_with_options(EngineOptions::default())
    }

    fn evaluate_all_formula_cells_with_options(
        &mut self,
        options: EngineOptions,
    ) -> Result<EvaluationStats> {
        let workbook = mem::replace(self, Workbook::empty());
        let mut engine = Engine::with_options(workbook, options);
        let result = engine.evaluate_all_formula_cells();
        *self = engine.into_workbook();
        result
    }
}
