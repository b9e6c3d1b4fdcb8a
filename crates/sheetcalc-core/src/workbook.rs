//! Workbook type - the document the engine evaluates

use crate::cell::{CellAddress, CellId, SheetId};
use crate::error::{Error, Result};
use crate::sheet::Sheet;
use crate::{Cell, MAX_SHEET_NAME_LEN};

/// A workbook: an ordered list of sheets
///
/// Each sheet gets a [`SheetId`] when it is added. Ids are never reused,
/// so no two sheets (even a removed one and its replacement) share a
/// [`CellId`].
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    next_sheet_id: u32,
}

impl Workbook {
    /// Create a new workbook with one sheet named "Sheet1"
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new(SheetId(0), "Sheet1")],
            next_sheet_id: 1,
        }
    }

    /// Create an empty workbook with no sheets
    pub fn empty() -> Self {
        Self {
            sheets: Vec::new(),
            next_sheet_id: 0,
        }
    }

    /// Get the number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the workbook has no sheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Get a sheet by index
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    /// Get a mutable sheet by index
    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    /// Get a sheet by name (case-insensitive)
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheet_index(name).map(|i| &self.sheets[i])
    }

    /// Get a mutable sheet by name (case-insensitive)
    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheet_index(name).map(move |i| &mut self.sheets[i])
    }

    /// Get a sheet by id
    pub fn sheet_by_id(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id() == id)
    }

    /// Get a mutable sheet by id
    pub fn sheet_by_id_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.id() == id)
    }

    /// Get the index of a sheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Get the current index of a sheet by id
    pub fn sheet_position(&self, id: SheetId) -> Option<usize> {
        self.sheets.iter().position(|s| s.id() == id)
    }

    /// Iterate over all sheets in order
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter()
    }

    /// Iterate over all sheets mutably
    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Sheet> {
        self.sheets.iter_mut()
    }

    // === Sheet management ===

    /// Append a new sheet
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        self.insert_sheet(self.sheets.len(), name)
    }

    /// Insert a new sheet at an index
    pub fn insert_sheet(&mut self, index: usize, name: &str) -> Result<SheetId> {
        if index > self.sheets.len() {
            return Err(Error::SheetIndexOutOfBounds(index, self.sheets.len()));
        }
        self.validate_sheet_name(name, None)?;

        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.sheets.insert(index, Sheet::new(id, name));
        Ok(id)
    }

    /// Remove a sheet by index
    pub fn remove_sheet(&mut self, index: usize) -> Result<Sheet> {
        self.check_index(index)?;
        Ok(self.sheets.remove(index))
    }

    /// Move a sheet to a new position
    pub fn move_sheet(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;

        let sheet = self.sheets.remove(from);
        self.sheets.insert(to, sheet);
        Ok(())
    }

    /// Rename a sheet
    pub fn rename_sheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        self.check_index(index)?;
        self.validate_sheet_name(new_name, Some(index))?;
        self.sheets[index].set_name(new_name);
        Ok(())
    }

    // === Cells by identity ===

    /// Build a [`CellId`] from a sheet name and an A1 address
    pub fn cell_id(&self, sheet: &str, address: &str) -> Result<CellId> {
        let sheet = self
            .sheet_by_name(sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?;
        let addr = CellAddress::parse(address)?;
        Ok(CellId::new(sheet.id(), addr.row, addr.col))
    }

    /// Look up the cell stored under an id
    ///
    /// `Ok(None)` means the position is blank; an unknown sheet id is an error.
    pub fn cell(&self, id: CellId) -> Result<Option<&Cell>> {
        let sheet = self
            .sheet_by_id(id.sheet)
            .ok_or_else(|| Error::SheetNotFound(id.sheet.to_string()))?;
        Ok(sheet.cell_at(id.row, id.col))
    }

    /// Mutable access to the sheet owning a cell id
    pub fn sheet_for_cell_mut(&mut self, id: CellId) -> Result<&mut Sheet> {
        self.sheet_by_id_mut(id.sheet)
            .ok_or_else(|| Error::SheetNotFound(id.sheet.to_string()))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.sheets.len() {
            return Err(Error::SheetIndexOutOfBounds(index, self.sheets.len()));
        }
        Ok(())
    }

    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Sheet name cannot start or end with an apostrophe".into(),
            ));
        }

        let clash = self
            .sheets
            .iter()
            .enumerate()
            .any(|(i, s)| Some(i) != exclude_index && s.name().eq_ignore_ascii_case(name));
        if clash {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet(0).unwrap().name(), "Sheet1");
        assert!(Workbook::empty().is_empty());
    }

    #[test]
    fn test_sheet_ids_are_never_reused() {
        let mut wb = Workbook::new();
        let a = wb.add_sheet("A").unwrap();
        wb.remove_sheet(1).unwrap();
        let b = wb.add_sheet("A").unwrap();
        assert_ne!(a, b);
        assert_eq!(wb.sheet_position(b), Some(1));
        assert_eq!(wb.sheet_position(a), None);
    }

    #[test]
    fn test_duplicate_name_is_case_insensitive() {
        let mut wb = Workbook::new();
        assert!(matches!(
            wb.add_sheet("SHEET1"),
            Err(Error::DuplicateSheetName(_))
        ));
        wb.add_sheet("Data").unwrap();
        assert_eq!(wb.sheet_index("data"), Some(1));
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();
        assert!(wb.add_sheet("").is_err());
        assert!(wb.add_sheet("Sheet/1").is_err());
        assert!(wb.add_sheet("Sheet:1").is_err());
        assert!(wb.add_sheet("'quoted").is_err());
        assert!(wb.add_sheet(&"A".repeat(MAX_SHEET_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_move_and_rename_keep_ids() {
        let mut wb = Workbook::new();
        wb.add_sheet("A").unwrap();
        wb.add_sheet("B").unwrap();
        let c = wb.add_sheet("C").unwrap();

        wb.move_sheet(3, 1).unwrap();
        let names: Vec<_> = wb.sheets().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Sheet1", "C", "A", "B"]);
        assert_eq!(wb.sheet_position(c), Some(1));

        wb.rename_sheet(1, "Renamed").unwrap();
        assert_eq!(wb.sheet_by_id(c).unwrap().name(), "Renamed");
        assert!(wb.rename_sheet(1, "a").is_err());
        wb.rename_sheet(1, "renamed").unwrap();
    }

    #[test]
    fn test_cell_by_id() {
        let mut wb = Workbook::new();
        wb.sheet_mut(0).unwrap().set_cell_value("B2", 7.0).unwrap();

        let id = wb.cell_id("sheet1", "B2").unwrap();
        assert_eq!(id, CellId::new(SheetId(0), 1, 1));
        assert!(wb.cell(id).unwrap().is_some());
        assert!(wb.cell(CellId::new(SheetId(0), 0, 0)).unwrap().is_none());
        assert!(wb.cell(CellId::new(SheetId(9), 0, 0)).is_err());
        assert!(wb.cell_id("Missing", "A1").is_err());
    }
}
