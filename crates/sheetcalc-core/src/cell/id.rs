//! Workbook-wide cell identity

use super::CellAddress;
use std::fmt;

/// Stable identity of a sheet within its workbook
///
/// Allocated by [`crate::Workbook`] when a sheet is added and never reused,
/// so it survives renames and moves while indices do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetId(pub u32);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet#{}", self.0)
    }
}

/// Key for caching and dependency tracking: sheet, 0-based row, 0-based column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellId {
    pub sheet: SheetId,
    pub row: u32,
    pub col: u16,
}

impl CellId {
    pub fn new(sheet: SheetId, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    /// The A1-style address of this cell within its sheet
    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.address())
    }
}
