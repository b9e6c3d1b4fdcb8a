//! Sheet type - sparse, row-ordered cell storage

use crate::cell::{CellAddress, CellRange, SheetId};
use crate::error::{Error, Result};
use crate::{Cell, Value, MAX_COLS, MAX_ROWS};
use std::collections::BTreeMap;

/// A single sheet of a workbook
///
/// Only non-blank cells are stored, in a row-major `BTreeMap`, so row and
/// cell iteration come out ordered by row index then column index.
#[derive(Debug, Clone)]
pub struct Sheet {
    id: SheetId,
    name: String,
    /// Row index → column map
    rows: BTreeMap<u32, BTreeMap<u16, Cell>>,
}

impl Sheet {
    pub(crate) fn new(id: SheetId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            rows: BTreeMap::new(),
        }
    }

    /// Stable identity of this sheet
    pub fn id(&self) -> SheetId {
        self.id
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    // === Cell access ===

    /// Get a cell by address string
    pub fn cell(&self, address: &str) -> Result<Option<&Cell>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_at(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Get a mutable cell by row and column indices
    pub fn cell_at_mut(&mut self, row: u32, col: u16) -> Option<&mut Cell> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// What a caller sees at a position without evaluating
    ///
    /// Plain cells give their literal, formula cells their valid stored
    /// result; everything else is blank.
    pub fn calculated_value_at(&self, row: u32, col: u16) -> Value {
        self.cell_at(row, col)
            .and_then(Cell::visible_value)
            .cloned()
            .unwrap_or_default()
    }

    // === Cell modification ===

    /// Set a plain value by address string
    pub fn set_cell_value<V: Into<Value>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a plain value by row and column indices
    ///
    /// Setting [`Value::Blank`] removes the cell.
    pub fn set_cell_value_at<V: Into<Value>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        self.set_cell_at(row, col, Cell::Plain(value.into()))
    }

    /// Set a formula by address string
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, formula)
    }

    /// Set a formula by row and column indices; any stored result is dropped
    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, formula: &str) -> Result<()> {
        self.set_cell_at(row, col, Cell::formula(formula))
    }

    /// Replace whatever is stored at a position
    pub fn set_cell_at(&mut self, row: u32, col: u16, cell: Cell) -> Result<()> {
        validate_position(row, col)?;

        if matches!(cell, Cell::Plain(Value::Blank)) {
            self.clear_cell_at(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, cell);
        }
        Ok(())
    }

    /// Remove a cell, returning what was stored
    pub fn clear_cell_at(&mut self, row: u32, col: u16) -> Option<Cell> {
        let row_map = self.rows.get_mut(&row)?;
        let removed = row_map.remove(&col);
        if row_map.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Store a formula result on an existing formula cell
    pub fn set_formula_result(&mut self, row: u32, col: u16, value: Value) -> Result<()> {
        let cell = self.cell_at_mut(row, col).ok_or_else(|| {
            Error::UnsupportedCellKind {
                operation: "set_formula_result",
                kind: crate::CellKind::Blank,
            }
        })?;
        cell.set_cached_result(value)
    }

    /// Clear the validity flag of every formula cell; returns how many were valid
    pub fn invalidate_all(&mut self) -> usize {
        self.rows
            .values_mut()
            .flat_map(|cols| cols.values_mut())
            .map(|cell| cell.invalidate())
            .filter(|&was_valid| was_valid)
            .count()
    }

    // === Iteration ===

    /// Iterate over rows that hold at least one cell, in row order
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|(&index, cells)| Row { index, cells })
    }

    /// Iterate over all stored cells in row then column order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &Cell)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, cell)| (row, col, cell)))
    }

    /// Iterate over the stored cells inside a range, in row then column order
    ///
    /// Only populated positions are visited, so the cost follows the number
    /// of stored cells rather than the size of the range.
    pub fn cells_in(&self, range: CellRange) -> impl Iterator<Item = (u32, u16, &Cell)> {
        let (first_col, last_col) = (range.start.col, range.end.col);
        self.rows
            .range(range.start.row..=range.end.row)
            .flat_map(move |(&row, cols)| {
                cols.range(first_col..=last_col)
                    .map(move |(&col, cell)| (row, col, cell))
            })
    }

    /// Iterate over all formula cells: (row, col, formula_text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.iter_cells()
            .filter_map(|(row, col, cell)| cell.formula_text().map(|text| (row, col, text)))
    }

    /// Get the number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check if the sheet has no cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Smallest range covering every stored cell
    pub fn used_range(&self) -> Option<CellRange> {
        let first_row = *self.rows.keys().next()?;
        let last_row = *self.rows.keys().next_back()?;
        let first_col = self.rows.values().filter_map(|r| r.keys().next()).min()?;
        let last_col = self.rows.values().filter_map(|r| r.keys().next_back()).max()?;
        Some(CellRange::from_indices(first_row, *first_col, last_row, *last_col))
    }
}

/// One populated row of a [`Sheet`]
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    index: u32,
    cells: &'a BTreeMap<u16, Cell>,
}

impl<'a> Row<'a> {
    /// 0-based row index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Cells of this row in column order
    pub fn cells(&self) -> impl Iterator<Item = (u16, &'a Cell)> {
        self.cells.iter().map(|(&col, cell)| (col, cell))
    }

    pub fn cell(&self, col: u16) -> Option<&'a Cell> {
        self.cells.get(&col)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn validate_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}
