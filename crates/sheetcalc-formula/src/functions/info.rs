//! Information functions

use super::{arg, FunctionResult};
use crate::evaluator::FormulaValue;
use sheetcalc_core::{ErrorCode, Value};

fn is(args: &[FormulaValue], test: impl Fn(&Value) -> bool) -> FunctionResult {
    Ok(Value::Boolean(test(&arg(args, 0))))
}

pub fn fn_isblank(args: &[FormulaValue]) -> FunctionResult {
    is(args, Value::is_blank)
}

pub fn fn_iserror(args: &[FormulaValue]) -> FunctionResult {
    is(args, Value::is_error)
}

/// ISERR(value) - Any error except `#N/A`
pub fn fn_iserr(args: &[FormulaValue]) -> FunctionResult {
    is(args, |v| {
        matches!(v, Value::Error(e) if *e != ErrorCode::NotApplicable)
    })
}

pub fn fn_isna(args: &[FormulaValue]) -> FunctionResult {
    is(args, |v| matches!(v, Value::Error(ErrorCode::NotApplicable)))
}

pub fn fn_isnumber(args: &[FormulaValue]) -> FunctionResult {
    is(args, |v| matches!(v, Value::Number(_)))
}

pub fn fn_istext(args: &[FormulaValue]) -> FunctionResult {
    is(args, |v| matches!(v, Value::Text(_)))
}

pub fn fn_islogical(args: &[FormulaValue]) -> FunctionResult {
    is(args, |v| matches!(v, Value::Boolean(_)))
}

pub fn fn_na(_args: &[FormulaValue]) -> FunctionResult {
    Err(ErrorCode::NotApplicable)
}

/// ERROR.TYPE(error_val)
///
/// 1 `#NULL!`, 2 `#DIV/0!`, 3 `#VALUE!`, 4 `#REF!`, 5 `#NAME?`, 6 `#NUM!`,
/// 7 `#N/A`. Anything else, including a circular reference, is `#N/A`.
pub fn fn_error_type(args: &[FormulaValue]) -> FunctionResult {
    let number = match arg(args, 0) {
        Value::Error(ErrorCode::NullIntersection) => 1.0,
        Value::Error(ErrorCode::DivideByZero) => 2.0,
        Value::Error(ErrorCode::InvalidValue) => 3.0,
        Value::Error(ErrorCode::InvalidReference) => 4.0,
        Value::Error(ErrorCode::NameNotFound) => 5.0,
        Value::Error(ErrorCode::NumericOverflow) => 6.0,
        Value::Error(ErrorCode::NotApplicable) => 7.0,
        _ => return Err(ErrorCode::NotApplicable),
    };
    Ok(Value::Number(number))
}
