//! End-to-end tests for the evaluation engine

use pretty_assertions::assert_eq;
use sheetcalc::prelude::*;
use sheetcalc::{ComparisonOrder, FormulaResult, FormulaValue, FunctionLibrary, FunctionRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Built-in functions, counting every call
#[derive(Clone, Default)]
struct CountingLibrary {
    calls: Arc<AtomicUsize>,
}

impl CountingLibrary {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FunctionLibrary for CountingLibrary {
    fn invoke(&self, name: &str, args: &[FormulaValue]) -> Option<FormulaResult<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FunctionRegistry::shared().invoke(name, args)
    }
}

fn workbook_with(cells: &[(&str, &str)]) -> Workbook {
    let mut workbook = Workbook::new();
    let sheet = workbook.sheet_mut(0).unwrap();
    for (address, content) in cells {
        if content.starts_with('=') {
            sheet.set_cell_formula(address, content).unwrap();
        } else if let Ok(n) = content.parse::<f64>() {
            sheet.set_cell_value(address, n).unwrap();
        } else {
            sheet.set_cell_value(address, *content).unwrap();
        }
    }
    workbook
}

fn id(engine: &Engine, address: &str) -> CellId {
    engine.workbook().cell_id("Sheet1", address).unwrap()
}

#[test]
fn test_non_formula_cells_evaluate_to_stored_value() {
    let mut engine = Engine::new(workbook_with(&[("A1", "3.5"), ("A2", "text")]));
    engine
        .workbook_mut()
        .sheet_mut(0)
        .unwrap()
        .set_cell_value("A3", true)
        .unwrap();

    let (a1, a2, a3, a4) = (
        id(&engine, "A1"),
        id(&engine, "A2"),
        id(&engine, "A3"),
        id(&engine, "A4"),
    );
    assert_eq!(engine.evaluate(a1).unwrap(), Value::Number(3.5));
    assert_eq!(engine.evaluate(a2).unwrap(), Value::text("text"));
    assert_eq!(engine.evaluate(a3).unwrap(), Value::Boolean(true));
    assert_eq!(engine.evaluate(a4).unwrap(), Value::Blank);
}

#[test]
fn test_second_evaluation_calls_no_functions() {
    let library = CountingLibrary::default();
    let workbook = workbook_with(&[("A1", "2"), ("A2", "=SUM(A1,ABS(-3))")]);
    let mut engine = Engine::with_library(workbook, library.clone());
    let a2 = id(&engine, "A2");

    assert_eq!(engine.evaluate(a2).unwrap(), Value::Number(5.0));
    assert_eq!(library.calls(), 2);

    assert_eq!(engine.evaluate(a2).unwrap(), Value::Number(5.0));
    assert_eq!(library.calls(), 2);
    assert_eq!(engine.stats().cache_hits, 1);
}

#[test]
fn test_cycles_of_any_length() {
    for length in 1..=6 {
        let cells: Vec<(String, String)> = (1..=length)
            .map(|row| {
                let next = if row == length { 1 } else { row + 1 };
                (format!("A{}", row), format!("=A{}+1", next))
            })
            .collect();
        let refs: Vec<(&str, &str)> = cells
            .iter()
            .map(|(a, f)| (a.as_str(), f.as_str()))
            .collect();

        for prefetch in [true, false] {
            let options = EngineOptions::default().with_prefetch(prefetch);
            let mut engine = Engine::with_options(workbook_with(&refs), options);
            for row in 1..=length {
                let cell = id(&engine, &format!("A{}", row));
                assert_eq!(
                    engine.evaluate(cell).unwrap(),
                    Value::Error(ErrorCode::CircularReference),
                    "cycle of {} at A{} (prefetch {})",
                    length,
                    row,
                    prefetch
                );
            }
        }
    }
}

#[test]
fn test_cycle_longer_than_default_depth_limit() {
    let cells: Vec<(String, String)> = (1..=300)
        .map(|row| (format!("A{}", row), format!("=A{}", row % 300 + 1)))
        .collect();
    let mut refs: Vec<(&str, &str)> = cells
        .iter()
        .map(|(a, f)| (a.as_str(), f.as_str()))
        .collect();
    refs.push(("B1", "=A150*2"));
    refs.push(("C1", "=6*7"));

    let mut engine = Engine::new(workbook_with(&refs));
    for row in [1, 150, 300] {
        let cell = id(&engine, &format!("A{}", row));
        assert_eq!(
            engine.evaluate(cell).unwrap(),
            Value::Error(ErrorCode::CircularReference)
        );
    }

    let mut workbook = workbook_with(&refs);
    let stats = workbook.evaluate_all_formula_cells().unwrap();
    assert_eq!(stats.formula_count, 302);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.circular_references, 301);
    let stored = |address: &str| {
        workbook
            .sheet(0)
            .unwrap()
            .cell(address)
            .unwrap()
            .and_then(|c| c.cached_value().cloned())
    };
    assert_eq!(
        stored("A300"),
        Some(Value::Error(ErrorCode::CircularReference))
    );
    assert_eq!(stored("C1"), Some(Value::Number(42.0)));
}

#[test]
fn test_whole_sheet_range_on_sparse_sheet() {
    let mut engine = Engine::new(workbook_with(&[
        ("C3", "1"),
        ("Q900", "2"),
        ("XFD1048576", "4"),
        ("E5", "=C3*10"),
        ("A1", "=COUNT(C1:XFD1048576)"),
        ("A2", "=SUM(C1:XFD1048576)"),
        ("B1", "=COUNTBLANK(C1:E5)"),
    ]));
    let (a1, a2, b1) = (id(&engine, "A1"), id(&engine, "A2"), id(&engine, "B1"));
    assert_eq!(engine.evaluate(a1).unwrap(), Value::Number(4.0));
    assert_eq!(engine.evaluate(a2).unwrap(), Value::Number(17.0));
    assert_eq!(engine.evaluate(b1).unwrap(), Value::Number(13.0));
}

#[test]
fn test_cell_downstream_of_cycle() {
    let mut engine = Engine::new(workbook_with(&[
        ("A1", "=B1"),
        ("B1", "=A1"),
        ("C1", "=A1*2"),
        ("D1", "=ISERROR(C1)"),
    ]));
    let (c1, d1) = (id(&engine, "C1"), id(&engine, "D1"));
    assert_eq!(
        engine.evaluate(c1).unwrap(),
        Value::Error(ErrorCode::CircularReference)
    );
    assert_eq!(engine.evaluate(d1).unwrap(), Value::Boolean(true));
}

#[test]
fn test_store_and_replace() {
    let mut engine = Engine::new(workbook_with(&[("A1", "4"), ("B1", "=A1^2"), ("C1", "=A1+1")]));
    let (b1, c1) = (id(&engine, "B1"), id(&engine, "C1"));

    assert_eq!(engine.evaluate_and_store(b1).unwrap(), Some(CellKind::Numeric));
    let stored = engine.workbook().cell(b1).unwrap().unwrap();
    assert!(stored.is_formula());
    assert_eq!(stored.cached_value(), Some(&Value::Number(16.0)));

    assert_eq!(engine.evaluate_and_replace(c1).unwrap(), Value::Number(5.0));
    let replaced = engine.workbook().cell(c1).unwrap().unwrap();
    assert!(!replaced.is_formula());
    assert_eq!(replaced.value(), Some(&Value::Number(5.0)));
}

#[test]
fn test_arithmetic_errors_and_precision() {
    let mut engine = Engine::new(workbook_with(&[("A1", "=10/0"), ("A2", "=1/3*3")]));
    let (a1, a2) = (id(&engine, "A1"), id(&engine, "A2"));

    assert_eq!(
        engine.evaluate(a1).unwrap(),
        Value::Error(ErrorCode::DivideByZero)
    );
    match engine.evaluate(a2).unwrap() {
        Value::Number(n) => assert!((n - 1.0).abs() < 1e-12, "got {}", n),
        other => panic!("expected a number, got {:?}", other),
    }
}

#[test]
fn test_cross_sheet_reference_and_rename() {
    let mut workbook = workbook_with(&[("A1", "=Sheet2!A1")]);
    workbook.add_sheet("Sheet2").unwrap();
    workbook
        .sheet_mut(1)
        .unwrap()
        .set_cell_value("A1", 42.0)
        .unwrap();

    let mut engine = Engine::new(workbook);
    let a1 = id(&engine, "A1");
    assert_eq!(engine.evaluate(a1).unwrap(), Value::Number(42.0));

    // Renamed behind the engine's back: the cached value survives until cleared
    engine.workbook_mut().rename_sheet(1, "Data").unwrap();
    assert_eq!(engine.evaluate(a1).unwrap(), Value::Number(42.0));

    engine.clear_all();
    assert_eq!(
        engine.evaluate(a1).unwrap(),
        Value::Error(ErrorCode::InvalidReference)
    );
}

#[test]
fn test_structural_edit_through_engine_clears_results() {
    let mut workbook = workbook_with(&[("A1", "=Data!A1")]);
    workbook.add_sheet("Other").unwrap();
    workbook
        .sheet_mut(1)
        .unwrap()
        .set_cell_value("A1", 7.0)
        .unwrap();

    let mut engine = Engine::new(workbook);
    let a1 = id(&engine, "A1");
    assert_eq!(
        engine.evaluate(a1).unwrap(),
        Value::Error(ErrorCode::InvalidReference)
    );

    engine.rename_sheet(1, "Data").unwrap();
    assert!(!engine.is_cached(a1));
    assert_eq!(engine.evaluate(a1).unwrap(), Value::Number(7.0));
}

#[test]
fn test_bulk_evaluation_is_one_top_level_evaluation_per_formula() {
    let mut engine = Engine::new(workbook_with(&[
        ("A1", "1"),
        ("A2", "=A1+1"),
        ("A3", "=A2+1"),
        ("B1", "=SUM(A1:A3)"),
        ("B2", "=B2"),
        ("C1", "=1+"),
    ]));

    let stats = engine.evaluate_all_formula_cells().unwrap();
    assert_eq!(stats.formula_count, 5);
    assert_eq!(engine.stats().top_level_evaluations, 5);
    assert_eq!(stats.errors, 1);

    let b1 = id(&engine, "B1");
    assert_eq!(
        engine.workbook().cell(b1).unwrap().unwrap().cached_value(),
        Some(&Value::Number(6.0))
    );
}

#[test]
fn test_edit_then_reevaluate_through_range() {
    let mut engine = Engine::new(workbook_with(&[
        ("A1", "1"),
        ("A2", "2"),
        ("A3", "3"),
        ("B1", "=SUM(A1:A3)"),
        ("B2", "=AVERAGE(A1:A3)"),
        ("C1", "=B1*10"),
    ]));
    let (a2, b1, b2, c1) = (
        id(&engine, "A2"),
        id(&engine, "B1"),
        id(&engine, "B2"),
        id(&engine, "C1"),
    );
    assert_eq!(engine.evaluate(c1).unwrap(), Value::Number(60.0));
    assert_eq!(engine.evaluate(b2).unwrap(), Value::Number(2.0));

    engine.set_cell_value(a2, 5.0).unwrap();
    assert!(!engine.is_cached(b1));
    assert!(!engine.is_cached(b2));
    assert!(!engine.is_cached(c1));
    assert_eq!(engine.evaluate(c1).unwrap(), Value::Number(90.0));
}

#[test]
fn test_workbook_extension_with_options() {
    let mut workbook = workbook_with(&[("A1", "=\"b\""), ("A2", "=A1>1")]);

    let options = EngineOptions::default().with_comparison(ComparisonOrder::Spreadsheet);
    let stats = workbook
        .evaluate_all_formula_cells_with_options(options)
        .unwrap();
    assert_eq!(stats.cells_evaluated, 2);
    assert_eq!(
        workbook.sheet(0).unwrap().cell("A2").unwrap().unwrap().cached_value(),
        Some(&Value::Boolean(true))
    );
}
