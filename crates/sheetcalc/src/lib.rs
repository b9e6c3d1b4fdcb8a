//! # sheetcalc
//!
//! A spreadsheet formula evaluation engine.
//!
//! The [`Engine`] owns a [`Workbook`] and computes formula cells on
//! demand. It provides:
//! - Per-cell result caching keyed by [`CellId`]
//! - Reference cycle detection, yielding `#CIRCULAR!`
//! - Selective invalidation through a reverse-dependency index
//! - Bulk evaluation of every formula cell
//!
//! Parsing, reference resolution and the built-in functions come from
//! `sheetcalc-formula`; the workbook model comes from `sheetcalc-core`.
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.add_sheet("Rates").unwrap();
//! workbook.sheet_mut(1).unwrap().set_cell_value("A1", 0.25).unwrap();
//!
//! let sheet = workbook.sheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 80.0).unwrap();
//! sheet.set_cell_formula("B1", "=A1*(1+Rates!A1)").unwrap();
//!
//! let mut engine = Engine::new(workbook);
//! let b1 = engine.workbook().cell_id("Sheet1", "B1").unwrap();
//! assert_eq!(engine.evaluate(b1).unwrap(), Value::Number(100.0));
//!
//! let a1 = engine.workbook().cell_id("Sheet1", "A1").unwrap();
//! engine.set_cell_value(a1, 40.0).unwrap();
//! assert_eq!(engine.evaluate(b1).unwrap(), Value::Number(50.0));
//! ```

pub mod calculation;
pub mod context;
pub mod engine;
mod invalidation;
pub mod options;
pub mod prelude;

pub use calculation::{EvaluationStats, WorkbookCalculationExt};
pub use context::EvaluationContext;
pub use engine::{Engine, EngineStats};
pub use options::{ComparisonOrder, EngineOptions, InvalidationPolicy};

// Re-export core types
pub use sheetcalc_core::{
    Cell, CellAddress, CellId, CellKind, CellRange, Error, ErrorCode, FormulaCell, Result,
    Sheet, SheetId, Value, Workbook,
};

// Re-export formula types
pub use sheetcalc_formula::{
    parse_formula, DependencyGraph, Expr, FormulaError, FormulaResult, FormulaValue,
    FunctionDef, FunctionLibrary, FunctionRegistry, FunctionResult,
};
