//! Cell-related types and utilities
//!
//! This module contains:
//! - [`Value`] - A computed or stored cell value
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangular range of cells (e.g., "A1:B10")
//! - [`CellId`] - A cell's workbook-wide identity
//! - [`Cell`] - What a sheet stores at one position

mod address;
mod data;
mod id;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use data::{Cell, CellKind, FormulaCell};
pub use id::{CellId, SheetId};
pub use value::{ErrorCode, SharedString, Value};
