//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc formula engine.
//!
//! This crate provides the types every other sheetcalc crate builds on:
//! - [`Value`] and [`ErrorCode`] - Computed cell results
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`CellId`] and [`SheetId`] - Stable keys for caching and dependency tracking
//! - [`Cell`] and [`CellKind`] - Plain and formula cells with their cached result
//! - [`Workbook`], [`Sheet`] - The document the engine evaluates
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{CellKind, Value, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", 42.0).unwrap();
//! sheet.set_cell_formula("B1", "=A1*2").unwrap();
//!
//! assert_eq!(sheet.cell("A1").unwrap().unwrap().kind(), CellKind::Numeric);
//! assert_eq!(sheet.cell("B1").unwrap().unwrap().kind(), CellKind::Formula);
//! assert_eq!(sheet.calculated_value_at(0, 0), Value::Number(42.0));
//! ```

pub mod cell;
pub mod error;
pub mod sheet;
pub mod workbook;

pub use cell::{
    Cell, CellAddress, CellId, CellKind, CellRange, ErrorCode, FormulaCell, SharedString,
    SheetId, Value,
};
pub use error::{Error, Result};
pub use sheet::{Row, Sheet};
pub use workbook::Workbook;

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
