//! Workbook-backed evaluation host for unit tests
//!
//! Evaluates referenced formulas recursively with no cache and no cycle
//! detection; that machinery belongs to the engine.

use crate::error::FormulaResult;
use crate::evaluator::{evaluate_scalar, EvaluationHost};
use crate::functions::{FunctionLibrary, FunctionRegistry};
use crate::parser::parse_formula;
use sheetcalc_core::{Cell, CellId, Value, Workbook};

pub(crate) struct TestHost {
    workbook: Workbook,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
        }
    }

    pub fn add_sheet(&mut self, name: &str) {
        self.workbook.add_sheet(name).unwrap();
    }

    pub fn set<V: Into<Value>>(&mut self, sheet: &str, address: &str, value: V) {
        self.workbook
            .sheet_by_name_mut(sheet)
            .unwrap()
            .set_cell_value(address, value)
            .unwrap();
    }

    pub fn set_formula(&mut self, sheet: &str, address: &str, formula: &str) {
        self.workbook
            .sheet_by_name_mut(sheet)
            .unwrap()
            .set_cell_formula(address, formula)
            .unwrap();
    }

    /// Evaluate at Sheet1!CV1000, away from the cells tests populate
    pub fn eval(&mut self, formula: &str) -> Value {
        eval_at(self, formula, "Sheet1", "CV1000")
    }
}

impl EvaluationHost for TestHost {
    fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    fn functions(&self) -> &dyn FunctionLibrary {
        FunctionRegistry::shared()
    }

    fn cell_value(&mut self, cell: CellId) -> FormulaResult<Value> {
        let text = match self.workbook.cell(cell)? {
            None => return Ok(Value::Blank),
            Some(Cell::Plain(value)) => return Ok(value.clone()),
            Some(Cell::Formula(formula)) => formula.text().to_string(),
        };
        let expr = parse_formula(&text)?;
        evaluate_scalar(&expr, cell, self)
    }
}

pub(crate) fn eval(formula: &str) -> Value {
    TestHost::new().eval(formula)
}

pub(crate) fn eval_at(host: &mut TestHost, formula: &str, sheet: &str, address: &str) -> Value {
    let position = host.workbook.cell_id(sheet, address).unwrap();
    let expr = parse_formula(formula).unwrap();
    evaluate_scalar(&expr, position, host).unwrap()
}
