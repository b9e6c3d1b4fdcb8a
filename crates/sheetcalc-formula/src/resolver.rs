//! Reference resolution
//!
//! Turns the sheet names written in a reference token into [`CellId`]s for
//! the workbook's current sheet topology. Resolution is pure and cheap, and
//! is redone on every evaluation so renamed or removed sheets are noticed.

use crate::ast::{ReferenceToken, SheetSpan};
use crate::error::{FormulaError, FormulaResult};
use sheetcalc_core::{CellAddress, CellId, CellRange, SheetId, Workbook, MAX_COLS, MAX_ROWS};

/// What a reference token names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Cell(CellId),
    Range(ResolvedRange),
}

/// A rectangle repeated over one or more sheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Sheets in workbook order
    sheets: Vec<SheetId>,
    range: CellRange,
}

impl ResolvedRange {
    pub fn new(sheets: Vec<SheetId>, range: CellRange) -> Self {
        Self { sheets, range }
    }

    pub fn sheets(&self) -> &[SheetId] {
        &self.sheets
    }

    pub fn range(&self) -> CellRange {
        self.range
    }

    pub fn cell_count(&self) -> u64 {
        self.range.cell_count() * self.sheets.len() as u64
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.sheets.contains(&id.sheet) && self.range.contains(id.row, id.col)
    }

    /// Every cell id, ordered by sheet position, then row, then column
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.sheets.iter().flat_map(move |&sheet| {
            self.range
                .cells()
                .map(move |(row, col)| CellId::new(sheet, row, col))
        })
    }
}

/// Resolve a reference token relative to the sheet holding the formula
///
/// A sheet that does not exist, or coordinates outside the grid, give
/// [`FormulaError::InvalidReference`]; the evaluator reports those as
/// `#REF!`. An empty sheet name is [`FormulaError::MalformedReference`].
pub fn resolve(
    token: ReferenceToken<'_>,
    current_sheet: SheetId,
    workbook: &Workbook,
) -> FormulaResult<Resolved> {
    match token {
        ReferenceToken::Cell(cell) => {
            check_address(&cell.address)?;
            let sheet = match &cell.sheet {
                Some(name) => sheet_named(workbook, name)?,
                None => current(workbook, current_sheet)?,
            };
            Ok(Resolved::Cell(CellId::new(
                sheet,
                cell.address.row,
                cell.address.col,
            )))
        }
        ReferenceToken::Range(range) => {
            check_address(&range.range.start)?;
            check_address(&range.range.end)?;
            let sheets = match &range.sheets {
                Some(span) => sheets_in_span(workbook, span)?,
                None => vec![current(workbook, current_sheet)?],
            };
            Ok(Resolved::Range(ResolvedRange::new(sheets, range.range)))
        }
    }
}

fn check_address(address: &CellAddress) -> FormulaResult<()> {
    if address.row >= MAX_ROWS || address.col >= MAX_COLS {
        return Err(FormulaError::InvalidReference(format!(
            "{} is outside the sheet",
            address
        )));
    }
    Ok(())
}

fn current(workbook: &Workbook, id: SheetId) -> FormulaResult<SheetId> {
    match workbook.sheet_by_id(id) {
        Some(sheet) => Ok(sheet.id()),
        None => Err(sheetcalc_core::Error::SheetNotFound(id.to_string()).into()),
    }
}

fn sheet_position(workbook: &Workbook, name: &str) -> FormulaResult<usize> {
    if name.is_empty() {
        return Err(FormulaError::MalformedReference(
            "empty sheet name".to_string(),
        ));
    }
    workbook
        .sheet_index(name)
        .ok_or_else(|| FormulaError::InvalidReference(format!("no sheet named '{}'", name)))
}

fn sheet_named(workbook: &Workbook, name: &str) -> FormulaResult<SheetId> {
    let index = sheet_position(workbook, name)?;
    sheet_id_at(workbook, index)
}

fn sheet_id_at(workbook: &Workbook, index: usize) -> FormulaResult<SheetId> {
    workbook
        .sheet(index)
        .map(|sheet| sheet.id())
        .ok_or_else(|| FormulaError::InvalidReference(format!("no sheet at position {}", index)))
}

/// Sheets from `first` through `last` in workbook order, endpoints in either order
fn sheets_in_span(workbook: &Workbook, span: &SheetSpan) -> FormulaResult<Vec<SheetId>> {
    let first = sheet_position(workbook, &span.first)?;
    let last = match &span.last {
        Some(name) => sheet_position(workbook, name)?,
        None => first,
    };
    let (lo, hi) = if first <= last {
        (first, last)
    } else {
        (last, first)
    };
    (lo..=hi).map(|index| sheet_id_at(workbook, index)).collect()
}
