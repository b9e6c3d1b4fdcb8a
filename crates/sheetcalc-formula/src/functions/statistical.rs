//! Statistical functions

use super::{collect_numbers, FunctionResult};
use crate::evaluator::{coerce_number, FormulaValue};
use sheetcalc_core::{ErrorCode, Value};

/// AVERAGE(number1, [number2], ...) - `#DIV/0!` when nothing is numeric
pub fn fn_average(args: &[FormulaValue]) -> FunctionResult {
    mean(&collect_numbers(args)?)
}

/// AVERAGEA(value1, [value2], ...)
///
/// Like AVERAGE, but inside ranges booleans count as 1/0 and text as 0.
/// Blank cells are still skipped.
pub fn fn_averagea(args: &[FormulaValue]) -> FunctionResult {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Scalar(value) => numbers.push(coerce_number(value)?),
            FormulaValue::Range(range) => {
                for value in range.values() {
                    match value {
                        Value::Number(n) => numbers.push(*n),
                        Value::Boolean(b) => numbers.push(if *b { 1.0 } else { 0.0 }),
                        Value::Text(_) => numbers.push(0.0),
                        Value::Error(e) => return Err(*e),
                        Value::Blank => {}
                    }
                }
            }
        }
    }
    mean(&numbers)
}

fn mean(numbers: &[f64]) -> FunctionResult {
    if numbers.is_empty() {
        return Err(ErrorCode::DivideByZero);
    }
    Ok(Value::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

/// MIN(number1, [number2], ...) - 0 when nothing is numeric
pub fn fn_min(args: &[FormulaValue]) -> FunctionResult {
    let numbers = collect_numbers(args)?;
    Ok(Value::Number(
        numbers.into_iter().reduce(f64::min).unwrap_or(0.0),
    ))
}

/// MAX(number1, [number2], ...) - 0 when nothing is numeric
pub fn fn_max(args: &[FormulaValue]) -> FunctionResult {
    let numbers = collect_numbers(args)?;
    Ok(Value::Number(
        numbers.into_iter().reduce(f64::max).unwrap_or(0.0),
    ))
}

/// MEDIAN(number1, [number2], ...)
pub fn fn_median(args: &[FormulaValue]) -> FunctionResult {
    let mut numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(ErrorCode::NumericOverflow);
    }
    numbers.sort_by(f64::total_cmp);

    let mid = numbers.len() / 2;
    let median = if numbers.len() % 2 == 0 {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    } else {
        numbers[mid]
    };
    Ok(Value::Number(median))
}

/// COUNT(value1, [value2], ...) - Counts numbers
///
/// Direct arguments count when they read as a number, so `COUNT("1", TRUE)`
/// is 2. Inside ranges only numbers count. Errors are never propagated.
pub fn fn_count(args: &[FormulaValue]) -> FunctionResult {
    let count = args
        .iter()
        .map(|arg| match arg {
            FormulaValue::Scalar(value) => usize::from(coerce_number(value).is_ok()),
            FormulaValue::Range(range) => range
                .values()
                .iter()
                .filter(|v| matches!(v, Value::Number(_)))
                .count(),
        })
        .sum::<usize>();
    Ok(Value::Number(count as f64))
}

/// COUNTA(value1, [value2], ...) - Counts non-empty values, errors included
pub fn fn_counta(args: &[FormulaValue]) -> FunctionResult {
    let count = args
        .iter()
        .flat_map(FormulaValue::values)
        .filter(|v| !is_empty(v))
        .count();
    Ok(Value::Number(count as f64))
}

/// COUNTBLANK(range) - Counts blank cells and empty text
pub fn fn_countblank(args: &[FormulaValue]) -> FunctionResult {
    let count: u64 = args
        .iter()
        .map(|arg| {
            let empty_text = arg.values().iter().filter(|v| is_empty(v)).count();
            arg.blank_count() + empty_text as u64
        })
        .sum();
    Ok(Value::Number(count as f64))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Blank => true,
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}
