//! Cache invalidation
//!
//! Edits go through the engine so the reverse-dependency index can find
//! the formula cells whose results they make stale. Structural sheet
//! edits change what sheet names resolve to and clear everything.

use crate::engine::Engine;
use crate::options::InvalidationPolicy;
use log::debug;
use sheetcalc_core::{Cell, CellId, Result, Sheet, SheetId, Value};
use sheetcalc_formula::Expr;
use std::sync::Arc;

impl Engine {
    /// Forget every cached result, parsed formula and dependency
    ///
    /// Stored results in the workbook are invalidated too.
    pub fn clear_all(&mut self) {
        self.context.clear();
        let invalidated: usize = self
            .workbook
            .sheets_mut()
            .map(|sheet| sheet.invalidate_all())
            .sum();
        debug!("cleared all results, {} stored results invalidated", invalidated);
    }

    /// A plain value changed at `cell`
    ///
    /// Every formula cell that transitively references it is invalidated.
    /// Anything the engine knew about a formula previously at `cell` is
    /// dropped as well.
    pub fn on_plain_value_set(&mut self, cell: CellId) {
        self.context.forget_formula(cell);
        self.invalidate_dependents(cell);
    }

    /// A formula was stored at `cell`, replacing whatever was there
    pub fn on_formula_set(&mut self, cell: CellId) {
        self.context.forget_formula(cell);
        self.invalidate_cell(cell);
        self.invalidate_dependents(cell);
    }

    fn invalidate_dependents(&mut self, cell: CellId) {
        if self.options.invalidation == InvalidationPolicy::ClearAll {
            self.clear_all();
            return;
        }

        let dependents = self.context.dependencies().transitive_dependents(&[cell]);
        debug!("{} invalidates {} dependent cells", cell, dependents.len());
        for dependent in dependents {
            self.invalidate_cell(dependent);
        }
    }

    /// Drop the engine's result and clear the cell's own validity flag
    fn invalidate_cell(&mut self, cell: CellId) {
        self.context.forget_result(cell);
        if let Some(stored) = self
            .workbook
            .sheet_by_id_mut(cell.sheet)
            .and_then(|sheet| sheet.cell_at_mut(cell.row, cell.col))
        {
            stored.invalidate();
        }
    }

    // === Edits ===

    /// Store a plain value and invalidate its dependents
    pub fn set_cell_value<V: Into<Value>>(&mut self, cell: CellId, value: V) -> Result<()> {
        self.workbook
            .sheet_for_cell_mut(cell)?
            .set_cell_value_at(cell.row, cell.col, value)?;
        self.on_plain_value_set(cell);
        Ok(())
    }

    /// Same as [`Engine::set_cell_value`]
    pub fn set_cached_plain_value<V: Into<Value>>(&mut self, cell: CellId, value: V) -> Result<()> {
        self.set_cell_value(cell, value)
    }

    /// Store formula text and invalidate the cell and its dependents
    ///
    /// Text that does not parse is rejected and the cell is left as it was.
    pub fn set_cell_formula(&mut self, cell: CellId, formula: &str) -> Result<()> {
        let expr = sheetcalc_formula::parse_formula(formula)?;
        self.store_formula(cell, formula.to_string(), expr)
    }

    /// Store a pre-built expression tree as the formula of `cell`
    ///
    /// The cell's formula text is the tree's canonical rendering.
    pub fn set_cell_formula_expr(&mut self, cell: CellId, expr: Expr) -> Result<()> {
        self.store_formula(cell, format!("={}", expr), expr)
    }

    fn store_formula(&mut self, cell: CellId, text: String, expr: Expr) -> Result<()> {
        self.workbook
            .sheet_for_cell_mut(cell)?
            .set_cell_at(cell.row, cell.col, Cell::formula(text))?;
        self.on_formula_set(cell);
        self.context
            .insert_parsed(cell, Arc::new(expr), &self.workbook);
        Ok(())
    }

    /// Remove a cell's content and invalidate its dependents
    pub fn clear_cell(&mut self, cell: CellId) -> Result<Option<Cell>> {
        let removed = self
            .workbook
            .sheet_for_cell_mut(cell)?
            .clear_cell_at(cell.row, cell.col);
        self.on_plain_value_set(cell);
        Ok(removed)
    }

    // === Structural edits ===

    /// Append a sheet
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        let id = self.workbook.add_sheet(name)?;
        self.clear_all();
        Ok(id)
    }

    /// Insert a sheet at a position
    pub fn insert_sheet(&mut self, index: usize, name: &str) -> Result<SheetId> {
        let id = self.workbook.insert_sheet(index, name)?;
        self.clear_all();
        Ok(id)
    }

    pub fn rename_sheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        self.workbook.rename_sheet(index, new_name)?;
        self.clear_all();
        Ok(())
    }

    pub fn move_sheet(&mut self, from: usize, to: usize) -> Result<()> {
        self.workbook.move_sheet(from, to)?;
        self.clear_all();
        Ok(())
    }

    pub fn remove_sheet(&mut self, index: usize) -> Result<Sheet> {
        let sheet = self.workbook.remove_sheet(index)?;
        self.clear_all();
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineOptions, InvalidationPolicy};
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{CellAddress, CellId, Value, Workbook};
    use sheetcalc_formula::{BinaryOperator, Expr};

    fn engine(policy: InvalidationPolicy) -> (Engine, [CellId; 4]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.sheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_formula("A2", "=A1*10").unwrap();
        sheet.set_cell_formula("A3", "=SUM(A1:A2)").unwrap();
        sheet.set_cell_value("B1", 7.0).unwrap();

        let ids = ["A1", "A2", "A3", "B1"].map(|a| workbook.cell_id("Sheet1", a).unwrap());
        let options = EngineOptions::default().with_invalidation(policy);
        (Engine::with_options(workbook, options), ids)
    }

    #[test]
    fn test_plain_edit_invalidates_transitive_dependents() {
        let (mut engine, [a1, a2, a3, b1]) = engine(InvalidationPolicy::Dependents);
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(11.0));

        engine.set_cell_value(b1, 8.0).unwrap();
        assert!(engine.is_cached(a3));

        engine.set_cell_value(a1, 2.0).unwrap();
        assert!(!engine.is_cached(a2));
        assert!(!engine.is_cached(a3));
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(22.0));
    }

    #[test]
    fn test_clear_all_policy() {
        let (mut engine, [a1, _, a3, b1]) = engine(InvalidationPolicy::ClearAll);
        engine.evaluate(a3).unwrap();

        engine.set_cell_value(b1, 8.0).unwrap();
        assert!(!engine.is_cached(a3));

        engine.set_cell_value(a1, 3.0).unwrap();
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(33.0));
    }

    #[test]
    fn test_formula_edit() {
        let (mut engine, [_, a2, a3, _]) = engine(InvalidationPolicy::Dependents);
        engine.evaluate(a3).unwrap();

        engine.set_cell_formula(a2, "=A1*100").unwrap();
        assert!(!engine.is_cached(a3));
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(101.0));

        assert!(engine.set_cell_formula(a2, "=A1*").is_err());
        assert_eq!(
            engine.workbook().cell(a2).unwrap().unwrap().formula_text(),
            Some("=A1*100")
        );
    }

    #[test]
    fn test_formula_expr_edit() {
        let (mut engine, [_, a2, a3, _]) = engine(InvalidationPolicy::Dependents);
        engine.evaluate(a3).unwrap();

        let expr = Expr::binary(
            BinaryOperator::Add,
            Expr::cell(CellAddress::parse("A1").unwrap()),
            Expr::Number(4.0),
        );
        engine.set_cell_formula_expr(a2, expr).unwrap();
        assert_eq!(
            engine.workbook().cell(a2).unwrap().unwrap().formula_text(),
            Some("=A1+4")
        );
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_formula_replaced_by_value() {
        let (mut engine, [a1, a2, a3, _]) = engine(InvalidationPolicy::Dependents);
        engine.evaluate(a3).unwrap();

        engine.set_cached_plain_value(a2, 5.0).unwrap();
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(6.0));

        // A2 no longer follows A1
        engine.set_cell_value(a1, 2.0).unwrap();
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_clear_cell() {
        let (mut engine, [a1, _, a3, _]) = engine(InvalidationPolicy::Dependents);
        engine.evaluate(a3).unwrap();

        engine.clear_cell(a1).unwrap();
        assert_eq!(engine.evaluate(a3).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_clear_all_invalidates_stored_results() {
        let (mut engine, [_, a2, a3, _]) = engine(InvalidationPolicy::Dependents);
        engine.evaluate_and_store(a2).unwrap();
        engine.evaluate(a3).unwrap();
        assert!(engine.context().len() >= 2);

        engine.clear_all();
        assert!(engine.context().is_empty());
        assert_eq!(engine.workbook().cell(a2).unwrap().unwrap().cached_value(), None);
    }
}
