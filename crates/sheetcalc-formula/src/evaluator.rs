//! Formula evaluator
//!
//! Walks an expression tree against an [`EvaluationHost`]. The host supplies
//! the workbook topology, the function library, and the value of any
//! referenced cell; caching and cycle handling are the host's business.

use crate::ast::{BinaryOperator, Expr, RangeToken, ReferenceToken, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionLibrary;
use crate::resolver::{resolve, Resolved};
use lazy_regex::regex_is_match;
use log::debug;
use sheetcalc_core::{CellId, ErrorCode, Value, Workbook};
use std::cmp::Ordering;

/// Value types during formula evaluation
///
/// Ranges only exist as function arguments; everywhere else a range is
/// narrowed to one cell by implicit intersection. A single-cell reference
/// passed to a function arrives as a 1x1 range, so aggregates skip text
/// in referenced cells the same way they do inside larger ranges.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Scalar(Value),
    Range(RangeValue),
}

/// The populated values of a resolved range
///
/// Positions are linear offsets ordered by sheet, then row, then column.
/// A position with no entry is blank, so a whole-sheet range costs what
/// its populated cells cost.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    positions: Vec<u64>,
    values: Vec<Value>,
    rows: u32,
    cols: u16,
    sheets: usize,
}

static BLANK: Value = Value::Blank;

impl RangeValue {
    /// A dense grid of values
    pub fn new(values: Vec<Value>, rows: u32, cols: u16, sheets: usize) -> Self {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(position, value)| (position as u64, value));
        Self::from_entries(entries, rows, cols, sheets)
    }

    /// Populated values at ascending linear positions; blanks are dropped
    pub fn from_entries(
        entries: impl IntoIterator<Item = (u64, Value)>,
        rows: u32,
        cols: u16,
        sheets: usize,
    ) -> Self {
        let (positions, values) = entries
            .into_iter()
            .filter(|(_, value)| !value.is_blank())
            .unzip();
        Self {
            positions,
            values,
            rows,
            cols,
            sheets,
        }
    }

    /// A single-sheet column of values
    pub fn column(values: Vec<Value>) -> Self {
        let rows = values.len() as u32;
        Self::new(values, rows, 1, 1)
    }

    /// Populated values in position order; blank cells are left out
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Populated values with their linear positions
    pub fn entries(&self) -> impl Iterator<Item = (u64, &Value)> + '_ {
        self.positions.iter().copied().zip(&self.values)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets
    }

    /// Positions covered, blank or not
    pub fn cell_count(&self) -> u64 {
        self.rows as u64 * self.cols as u64 * self.sheets as u64
    }

    pub fn blank_count(&self) -> u64 {
        self.cell_count() - self.values.len() as u64
    }

    /// Same rows, columns and sheet count
    pub fn same_shape(&self, other: &RangeValue) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.sheets == other.sheets
    }

    /// Value at a linear position, `None` past the end
    pub fn value_at(&self, position: u64) -> Option<&Value> {
        if position >= self.cell_count() {
            return None;
        }
        match self.positions.binary_search(&position) {
            Ok(index) => self.values.get(index),
            Err(_) => Some(&BLANK),
        }
    }

    /// Value at an offset from the top-left corner of the first sheet
    pub fn get(&self, row: u32, col: u16) -> Option<&Value> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.value_at(row as u64 * self.cols as u64 + col as u64)
    }
}

impl FormulaValue {
    /// Every populated value, a scalar being a one-element sequence
    pub fn values(&self) -> &[Value] {
        match self {
            FormulaValue::Scalar(v) => std::slice::from_ref(v),
            FormulaValue::Range(r) => r.values(),
        }
    }

    /// Populated values with their linear positions, a scalar sitting at 0
    pub fn entries(&self) -> Box<dyn Iterator<Item = (u64, &Value)> + '_> {
        match self {
            FormulaValue::Scalar(v) => Box::new(std::iter::once((0, v))),
            FormulaValue::Range(r) => Box::new(r.entries()),
        }
    }

    /// Value at a linear position; a scalar only has position 0
    pub fn value_at(&self, position: u64) -> Option<&Value> {
        match self {
            FormulaValue::Scalar(v) => (position == 0).then_some(v),
            FormulaValue::Range(r) => r.value_at(position),
        }
    }

    pub fn cell_count(&self) -> u64 {
        match self {
            FormulaValue::Scalar(_) => 1,
            FormulaValue::Range(r) => r.cell_count(),
        }
    }

    /// Blank positions of a range that [`FormulaValue::values`] leaves out
    pub fn blank_count(&self) -> u64 {
        match self {
            FormulaValue::Scalar(_) => 0,
            FormulaValue::Range(r) => r.blank_count(),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, FormulaValue::Range(_))
    }

    /// The single value of a scalar or a one-cell range
    ///
    /// Larger ranges have no scalar reading and give `#VALUE!`.
    pub fn to_scalar(&self) -> Value {
        match self {
            FormulaValue::Scalar(v) => v.clone(),
            FormulaValue::Range(r) if r.cell_count() == 1 => {
                r.value_at(0).cloned().unwrap_or_default()
            }
            FormulaValue::Range(_) => Value::Error(ErrorCode::InvalidValue),
        }
    }
}

impl From<Value> for FormulaValue {
    fn from(value: Value) -> Self {
        FormulaValue::Scalar(value)
    }
}

/// How values of different types order against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComparisonOrder {
    /// Text > Number > Boolean > Blank
    #[default]
    Ranked,
    /// Blank takes the other operand's type; Boolean > Text > Number
    Spreadsheet,
}

/// What the evaluator needs from its surroundings
pub trait EvaluationHost {
    /// Workbook used to resolve sheet names
    fn workbook(&self) -> &Workbook;

    /// Functions available to formulas
    fn functions(&self) -> &dyn FunctionLibrary;

    fn comparison(&self) -> ComparisonOrder {
        ComparisonOrder::default()
    }

    /// Value of a referenced cell, evaluating it if it holds a formula
    fn cell_value(&mut self, cell: CellId) -> FormulaResult<Value>;
}

/// Evaluate an expression for the formula stored at `position`
pub fn evaluate(
    expr: &Expr,
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<FormulaValue> {
    match expr {
        Expr::RangeReference(token) => evaluate_range(token, position, host),
        Expr::Reference(token) => {
            match resolve_reference(ReferenceToken::Cell(token), position, host.workbook())? {
                Ok(Resolved::Cell(cell)) => {
                    let value = host.cell_value(cell)?;
                    Ok(FormulaValue::Range(RangeValue::new(vec![value], 1, 1, 1)))
                }
                Ok(Resolved::Range(_)) => Ok(Value::Error(ErrorCode::InvalidValue).into()),
                Err(code) => Ok(Value::Error(code).into()),
            }
        }
        _ => evaluate_scalar(expr, position, host).map(FormulaValue::Scalar),
    }
}

/// Evaluate an expression down to one value
///
/// A range reference in scalar position is narrowed by implicit
/// intersection with `position`.
pub fn evaluate_scalar(
    expr: &Expr,
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<Value> {
    let value = match expr {
        // === Literals ===
        Expr::Number(n) => Value::Number(*n),
        Expr::Text(s) => Value::text(s),
        Expr::Boolean(b) => Value::Boolean(*b),
        Expr::Error(e) => Value::Error(*e),

        // === References ===
        Expr::Reference(token) => {
            match resolve_reference(ReferenceToken::Cell(token), position, host.workbook())? {
                Ok(Resolved::Cell(cell)) => host.cell_value(cell)?,
                Ok(Resolved::Range(_)) => Value::Error(ErrorCode::InvalidValue),
                Err(code) => Value::Error(code),
            }
        }
        Expr::RangeReference(token) => implicit_intersection(token, position, host)?,

        // === Operators ===
        Expr::BinaryOp { op, left, right } => {
            evaluate_binary_op(*op, left, right, position, host)?
        }
        Expr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, position, host)?,

        // === Functions ===
        Expr::Function { name, args } => evaluate_function(name, args, position, host)?,
    };
    Ok(finite(value))
}

/// Resolve a token, turning "names nothing" into `#REF!`
fn resolve_reference(
    token: ReferenceToken<'_>,
    position: CellId,
    workbook: &Workbook,
) -> FormulaResult<Result<Resolved, ErrorCode>> {
    match resolve(token, position.sheet, workbook) {
        Ok(resolved) => Ok(Ok(resolved)),
        Err(FormulaError::InvalidReference(reason)) => {
            debug!("{} in formula at {}", reason, position);
            Ok(Err(ErrorCode::InvalidReference))
        }
        Err(e) => Err(e),
    }
}

fn evaluate_range(
    token: &RangeToken,
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<FormulaValue> {
    let range = match resolve_reference(ReferenceToken::Range(token), position, host.workbook())? {
        Ok(Resolved::Range(range)) => range,
        Ok(Resolved::Cell(cell)) => return Ok(FormulaValue::Scalar(host.cell_value(cell)?)),
        Err(code) => return Ok(FormulaValue::Scalar(Value::Error(code))),
    };

    // Only populated cells are visited; the rest of the range reads blank
    let shape = range.range();
    let cols = shape.col_count() as u64;
    let cells: Vec<(u64, CellId)> = {
        let workbook = host.workbook();
        range
            .sheets()
            .iter()
            .enumerate()
            .filter_map(|(offset, &id)| Some((offset as u64, workbook.sheet_by_id(id)?)))
            .flat_map(|(offset, sheet)| {
                let id = sheet.id();
                sheet.cells_in(shape).map(move |(row, col, _)| {
                    let at = offset * shape.cell_count()
                        + (row - shape.start.row) as u64 * cols
                        + (col - shape.start.col) as u64;
                    (at, CellId::new(id, row, col))
                })
            })
            .collect()
    };

    let mut entries = Vec::with_capacity(cells.len());
    for (at, cell) in cells {
        entries.push((at, host.cell_value(cell)?));
    }
    Ok(FormulaValue::Range(RangeValue::from_entries(
        entries,
        shape.row_count(),
        shape.col_count(),
        range.sheets().len(),
    )))
}

/// Narrow a range to the cell sharing the formula's row or column
///
/// A one-cell range gives that cell. A one-column range on the formula's
/// sheet gives the cell on the formula's row, a one-row range the cell in
/// the formula's column. Anything else is `#VALUE!`.
fn implicit_intersection(
    token: &RangeToken,
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<Value> {
    let range = match resolve_reference(ReferenceToken::Range(token), position, host.workbook())? {
        Ok(Resolved::Range(range)) => range,
        Ok(Resolved::Cell(cell)) => return host.cell_value(cell),
        Err(code) => return Ok(Value::Error(code)),
    };

    let sheet = match range.sheets() {
        [sheet] => *sheet,
        _ => return Ok(Value::Error(ErrorCode::InvalidValue)),
    };
    let rect = range.range();

    let target = if rect.is_single_cell() {
        Some((rect.start.row, rect.start.col))
    } else if sheet != position.sheet {
        None
    } else if rect.col_count() == 1 && rect.contains(position.row, rect.start.col) {
        Some((position.row, rect.start.col))
    } else if rect.row_count() == 1 && rect.contains(rect.start.row, position.col) {
        Some((rect.start.row, position.col))
    } else {
        None
    };

    match target {
        Some((row, col)) => host.cell_value(CellId::new(sheet, row, col)),
        None => Ok(Value::Error(ErrorCode::InvalidValue)),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &Expr,
    right: &Expr,
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<Value> {
    let left_val = evaluate_scalar(left, position, host)?;
    let right_val = evaluate_scalar(right, position, host)?;

    // Propagate errors, left first
    if let Value::Error(e) = left_val {
        return Ok(Value::Error(e));
    }
    if let Value::Error(e) = right_val {
        return Ok(Value::Error(e));
    }

    if op == BinaryOperator::Concat {
        let mut text = coerce_text(&left_val);
        text.push_str(&coerce_text(&right_val));
        return Ok(Value::text(text));
    }

    if op.is_comparison() {
        let ordering = compare_values(&left_val, &right_val, host.comparison());
        let result = match op {
            BinaryOperator::Equal => ordering == Ordering::Equal,
            BinaryOperator::NotEqual => ordering != Ordering::Equal,
            BinaryOperator::LessThan => ordering == Ordering::Less,
            BinaryOperator::LessEqual => ordering != Ordering::Greater,
            BinaryOperator::GreaterThan => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        };
        return Ok(Value::Boolean(result));
    }

    let (l, r) = match (coerce_number(&left_val), coerce_number(&right_val)) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => return Ok(Value::Error(e)),
    };

    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Ok(Value::Error(ErrorCode::DivideByZero));
            }
            l / r
        }
        BinaryOperator::Power => {
            if l == 0.0 && r < 0.0 {
                return Ok(Value::Error(ErrorCode::DivideByZero));
            }
            l.powf(r)
        }
        _ => return Ok(Value::Error(ErrorCode::InvalidValue)),
    };
    Ok(Value::Number(result))
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &Expr,
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<Value> {
    let val = evaluate_scalar(operand, position, host)?;

    let n = match coerce_number(&val) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };

    Ok(Value::Number(match op {
        UnaryOperator::Negate => -n,
        UnaryOperator::Percent => n / 100.0,
    }))
}

/// Evaluate a function call; every argument is evaluated, left to right
fn evaluate_function(
    name: &str,
    args: &[Expr],
    position: CellId,
    host: &mut dyn EvaluationHost,
) -> FormulaResult<Value> {
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, position, host)?);
    }

    match host.functions().invoke(name, &evaluated_args) {
        Some(result) => result,
        None => {
            debug!("unknown function {} in formula at {}", name, position);
            Ok(Value::Error(ErrorCode::NameNotFound))
        }
    }
}

/// Replace non-finite numbers with `#NUM!`
fn finite(value: Value) -> Value {
    match value {
        Value::Number(n) if !n.is_finite() => Value::Error(ErrorCode::NumericOverflow),
        other => other,
    }
}

// === Coercion ===

/// Read a number out of a value used as a numeric operand
///
/// Booleans are 1/0, blank is 0, text must parse as a number.
pub fn coerce_number(value: &Value) -> Result<f64, ErrorCode> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Blank => Ok(0.0),
        Value::Text(s) => parse_number(s.as_str()).ok_or(ErrorCode::InvalidValue),
        Value::Error(e) => Err(*e),
    }
}

/// Read a boolean out of a value used as a condition
pub fn coerce_bool(value: &Value) -> Result<bool, ErrorCode> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Blank => Ok(false),
        Value::Text(s) if s.as_str().eq_ignore_ascii_case("TRUE") => Ok(true),
        Value::Text(s) if s.as_str().eq_ignore_ascii_case("FALSE") => Ok(false),
        Value::Text(_) => Err(ErrorCode::InvalidValue),
        Value::Error(e) => Err(*e),
    }
}

/// Display text of a value, numbers shown to 15 significant digits
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

fn format_number(n: f64) -> String {
    // 0.1+0.2 shows as 0.3
    let rounded: f64 = format!("{:.14e}", n).parse().unwrap_or(n);
    Value::Number(rounded).to_string()
}

/// Parse numeric text such as ` 12`, `-1.5e3` or `50%`
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if !regex_is_match!(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?%?$", text) {
        return None;
    }
    match text.strip_suffix('%') {
        Some(number) => number.parse::<f64>().ok().map(|n| n / 100.0),
        None => text.parse().ok(),
    }
}

// === Comparison ===

/// Order two non-error values
pub fn compare_values(left: &Value, right: &Value, order: ComparisonOrder) -> Ordering {
    match order {
        ComparisonOrder::Ranked => compare_same_or_rank(left, right, ranked),
        ComparisonOrder::Spreadsheet => {
            let left = promote_blank(left, right);
            let right = promote_blank(right, left.as_ref());
            compare_same_or_rank(left.as_ref(), right.as_ref(), spreadsheet_rank)
        }
    }
}

fn compare_same_or_rank(left: &Value, right: &Value, rank: fn(&Value) -> u8) -> Ordering {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        (Value::Text(l), Value::Text(r)) => l
            .as_str()
            .to_lowercase()
            .cmp(&r.as_str().to_lowercase()),
        (Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn ranked(value: &Value) -> u8 {
    match value {
        Value::Blank => 0,
        Value::Boolean(_) => 1,
        Value::Number(_) => 2,
        Value::Text(_) => 3,
        Value::Error(_) => 4,
    }
}

fn spreadsheet_rank(value: &Value) -> u8 {
    match value {
        Value::Blank => 0,
        Value::Number(_) => 1,
        Value::Text(_) => 2,
        Value::Boolean(_) => 3,
        Value::Error(_) => 4,
    }
}

/// Blank compared against a typed value reads as that type's zero
fn promote_blank<'a>(value: &'a Value, other: &Value) -> std::borrow::Cow<'a, Value> {
    use std::borrow::Cow;
    match (value, other) {
        (Value::Blank, Value::Number(_)) => Cow::Owned(Value::Number(0.0)),
        (Value::Blank, Value::Text(_)) => Cow::Owned(Value::text("")),
        (Value::Blank, Value::Boolean(_)) => Cow::Owned(Value::Boolean(false)),
        _ => Cow::Borrowed(value),
    }
}
