//! Logical functions
//!
//! Arguments arrive already evaluated, so `IF` picks between two computed
//! values rather than skipping the branch it does not take.

use super::{arg, bool_arg, FunctionResult};
use crate::evaluator::{coerce_bool, FormulaValue};
use sheetcalc_core::{ErrorCode, Value};

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[FormulaValue]) -> FunctionResult {
    if bool_arg(args, 0)? {
        Ok(arg(args, 1))
    } else if args.len() > 2 {
        Ok(arg(args, 2))
    } else {
        Ok(Value::Boolean(false))
    }
}

/// Booleans for AND/OR/XOR
///
/// Direct arguments must read as booleans. Inside ranges text and blanks
/// are skipped. With nothing left to test the result is `#VALUE!`.
fn collect_bools(args: &[FormulaValue]) -> Result<Vec<bool>, ErrorCode> {
    let mut bools = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Scalar(value) => bools.push(coerce_bool(value)?),
            FormulaValue::Range(range) => {
                for value in range.values() {
                    match value {
                        Value::Boolean(b) => bools.push(*b),
                        Value::Number(n) => bools.push(*n != 0.0),
                        Value::Error(e) => return Err(*e),
                        Value::Text(_) | Value::Blank => {}
                    }
                }
            }
        }
    }
    if bools.is_empty() {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(bools)
}

pub fn fn_and(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Boolean(collect_bools(args)?.into_iter().all(|b| b)))
}

pub fn fn_or(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Boolean(collect_bools(args)?.into_iter().any(|b| b)))
}

/// XOR(logical1, ...) - TRUE when an odd number of arguments are TRUE
pub fn fn_xor(args: &[FormulaValue]) -> FunctionResult {
    let trues = collect_bools(args)?.into_iter().filter(|b| *b).count();
    Ok(Value::Boolean(trues % 2 == 1))
}

pub fn fn_not(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Boolean(!bool_arg(args, 0)?))
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaValue]) -> FunctionResult {
    match arg(args, 0) {
        Value::Error(_) => Ok(arg(args, 1)),
        value => Ok(value),
    }
}

/// IFNA(value, value_if_na) - Only `#N/A` is replaced
pub fn fn_ifna(args: &[FormulaValue]) -> FunctionResult {
    match arg(args, 0) {
        Value::Error(ErrorCode::NotApplicable) => Ok(arg(args, 1)),
        value => Ok(value),
    }
}

pub fn fn_true(_args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Boolean(true))
}

pub fn fn_false(_args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Boolean(false))
}
