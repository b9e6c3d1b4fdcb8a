//! Math functions

use super::{collect_numbers, number_arg, optional_number_arg, FunctionResult};
use crate::evaluator::FormulaValue;
use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use sheetcalc_core::{ErrorCode, Value};

fn number(n: f64) -> FunctionResult {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(ErrorCode::NumericOverflow)
    }
}

/// SUM(number1, [number2], ...)
pub fn fn_sum(args: &[FormulaValue]) -> FunctionResult {
    number(collect_numbers(args)?.iter().sum())
}

/// SUMSQ(number1, [number2], ...) - Sum of squares
pub fn fn_sumsq(args: &[FormulaValue]) -> FunctionResult {
    number(collect_numbers(args)?.iter().map(|n| n * n).sum())
}

/// PRODUCT(number1, [number2], ...) - 0 when nothing numeric is given
pub fn fn_product(args: &[FormulaValue]) -> FunctionResult {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Ok(Value::Number(0.0));
    }
    number(numbers.iter().product())
}

pub fn fn_abs(args: &[FormulaValue]) -> FunctionResult {
    number(number_arg(args, 0)?.abs())
}

pub fn fn_sign(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    Ok(Value::Number(if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    }))
}

/// INT(number) - Rounds down, so INT(-1.5) is -2
pub fn fn_int(args: &[FormulaValue]) -> FunctionResult {
    number(number_arg(args, 0)?.floor())
}

/// TRUNC(number, [num_digits])
pub fn fn_trunc(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let digits = optional_number_arg(args, 1, 0.0)?;
    round_decimal(n, digits, RoundingStrategy::ToZero)
}

/// ROUND(number, num_digits) - Half away from zero
///
/// Rounding happens in decimal, so ROUND(2.675, 2) is 2.68 even though
/// the nearest double to 2.675 sits just below it.
pub fn fn_round(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let digits = number_arg(args, 1)?;
    round_decimal(n, digits, RoundingStrategy::MidpointAwayFromZero)
}

pub fn fn_roundup(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let digits = number_arg(args, 1)?;
    round_decimal(n, digits, RoundingStrategy::AwayFromZero)
}

pub fn fn_rounddown(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let digits = number_arg(args, 1)?;
    round_decimal(n, digits, RoundingStrategy::ToZero)
}

/// Round to `digits` decimal places; negative digits round left of the point
fn round_decimal(n: f64, digits: f64, strategy: RoundingStrategy) -> FunctionResult {
    // Beyond Decimal's range a double has no fractional part left
    let Some(decimal) = Decimal::from_f64(n) else {
        return number(n);
    };
    let digits = digits.trunc().clamp(-28.0, 28.0) as i32;

    let rounded = if digits >= 0 {
        decimal.round_dp_with_strategy(digits as u32, strategy)
    } else {
        let factor = Decimal::from_i128_with_scale(10_i128.pow(digits.unsigned_abs()), 0);
        decimal
            .checked_div(factor)
            .map(|scaled| scaled.round_dp_with_strategy(0, strategy))
            .and_then(|scaled| scaled.checked_mul(factor))
            .ok_or(ErrorCode::NumericOverflow)?
    };

    rounded
        .to_f64()
        .map(Value::Number)
        .ok_or(ErrorCode::NumericOverflow)
}

/// CEILING(number, significance)
pub fn fn_ceiling(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let significance = number_arg(args, 1)?;
    if significance == 0.0 {
        return Ok(Value::Number(0.0));
    }
    if n > 0.0 && significance < 0.0 {
        return Err(ErrorCode::NumericOverflow);
    }
    number((n / significance).ceil() * significance)
}

/// FLOOR(number, significance)
pub fn fn_floor(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let significance = number_arg(args, 1)?;
    if significance == 0.0 {
        return Err(ErrorCode::DivideByZero);
    }
    if n > 0.0 && significance < 0.0 {
        return Err(ErrorCode::NumericOverflow);
    }
    number((n / significance).floor() * significance)
}

/// MOD(number, divisor) - The result takes the divisor's sign
pub fn fn_mod(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let divisor = number_arg(args, 1)?;
    if divisor == 0.0 {
        return Err(ErrorCode::DivideByZero);
    }
    number(n - divisor * (n / divisor).floor())
}

/// POWER(number, power) - Same rules as the `^` operator
pub fn fn_power(args: &[FormulaValue]) -> FunctionResult {
    let base = number_arg(args, 0)?;
    let exponent = number_arg(args, 1)?;
    if base == 0.0 && exponent < 0.0 {
        return Err(ErrorCode::DivideByZero);
    }
    number(base.powf(exponent))
}

pub fn fn_sqrt(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    if n < 0.0 {
        return Err(ErrorCode::NumericOverflow);
    }
    number(n.sqrt())
}

pub fn fn_exp(args: &[FormulaValue]) -> FunctionResult {
    number(number_arg(args, 0)?.exp())
}

pub fn fn_ln(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    if n <= 0.0 {
        return Err(ErrorCode::NumericOverflow);
    }
    number(n.ln())
}

/// LOG(number, [base]) - Base 10 unless given
pub fn fn_log(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    let base = optional_number_arg(args, 1, 10.0)?;
    if n <= 0.0 || base <= 0.0 {
        return Err(ErrorCode::NumericOverflow);
    }
    if base == 1.0 {
        return Err(ErrorCode::DivideByZero);
    }
    number(n.ln() / base.ln())
}

pub fn fn_log10(args: &[FormulaValue]) -> FunctionResult {
    let n = number_arg(args, 0)?;
    if n <= 0.0 {
        return Err(ErrorCode::NumericOverflow);
    }
    number(n.log10())
}

pub fn fn_pi(_args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Number(std::f64::consts::PI))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{eval, TestHost};
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{ErrorCode, Value};

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_sum() {
        assert_eq!(eval("=SUM(1, 2, 3)"), num(6.0));
        assert_eq!(eval("=SUM(\"2\", TRUE)"), num(3.0));
        assert_eq!(eval("=SUM(\"abc\")"), Value::Error(ErrorCode::InvalidValue));
    }

    #[test]
    fn test_sum_over_ranges_skips_non_numbers() {
        let mut host = TestHost::new();
        host.set("Sheet1", "A1", 1.0);
        host.set("Sheet1", "A2", "10");
        host.set("Sheet1", "A3", true);
        host.set("Sheet1", "A4", 4.0);
        host.set_formula("Sheet1", "B1", "=A1*100");

        assert_eq!(host.eval("=SUM(A1:A5)"), num(5.0));
        assert_eq!(host.eval("=SUM(A1:B1)"), num(101.0));
        // A single referenced cell behaves like a range
        assert_eq!(host.eval("=SUM(A2)"), num(0.0));
        assert_eq!(host.eval("=SUMSQ(A1:A4)"), num(17.0));
        assert_eq!(host.eval("=PRODUCT(A1:A4, 2)"), num(8.0));
    }

    #[test]
    fn test_sum_propagates_first_error() {
        let mut host = TestHost::new();
        host.set("Sheet1", "A1", 1.0);
        host.set("Sheet1", "A2", Value::Error(ErrorCode::NotApplicable));
        host.set_formula("Sheet1", "A3", "=1/0");

        assert_eq!(
            host.eval("=SUM(A1:A3)"),
            Value::Error(ErrorCode::NotApplicable)
        );
        assert_eq!(host.eval("=SUM(A3, A2)"), Value::Error(ErrorCode::DivideByZero));
    }

    #[test]
    fn test_product_of_nothing() {
        let mut host = TestHost::new();
        assert_eq!(host.eval("=PRODUCT(A1:A3)"), num(0.0));
    }

    #[test]
    fn test_round_family() {
        assert_eq!(eval("=ROUND(2.5, 0)"), num(3.0));
        assert_eq!(eval("=ROUND(-2.5, 0)"), num(-3.0));
        assert_eq!(eval("=ROUND(2.675, 2)"), num(2.68));
        assert_eq!(eval("=ROUND(1234.5678, -2)"), num(1200.0));
        assert_eq!(eval("=ROUNDUP(3.14159, 2)"), num(3.15));
        assert_eq!(eval("=ROUNDUP(-3.14159, 2)"), num(-3.15));
        assert_eq!(eval("=ROUNDDOWN(3.99, 0)"), num(3.0));
        assert_eq!(eval("=ROUNDDOWN(-3.99, 0)"), num(-3.0));
        assert_eq!(eval("=TRUNC(8.9)"), num(8.0));
        assert_eq!(eval("=TRUNC(-8.96, 1)"), num(-8.9));
    }

    #[test]
    fn test_int_and_sign() {
        assert_eq!(eval("=INT(-1.5)"), num(-2.0));
        assert_eq!(eval("=INT(1.5)"), num(1.0));
        assert_eq!(eval("=SIGN(-4)"), num(-1.0));
        assert_eq!(eval("=SIGN(0)"), num(0.0));
        assert_eq!(eval("=ABS(-4)"), num(4.0));
    }

    #[test]
    fn test_ceiling_floor() {
        assert_eq!(eval("=CEILING(2.5, 1)"), num(3.0));
        assert_eq!(eval("=CEILING(-2.5, -2)"), num(-4.0));
        assert_eq!(eval("=CEILING(-2.5, 2)"), num(-2.0));
        assert_eq!(eval("=CEILING(2.5, -2)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=FLOOR(3.7, 2)"), num(2.0));
        assert_eq!(eval("=FLOOR(3.7, 0)"), Value::Error(ErrorCode::DivideByZero));
    }

    #[test]
    fn test_mod_takes_divisor_sign() {
        assert_eq!(eval("=MOD(3, 2)"), num(1.0));
        assert_eq!(eval("=MOD(-3, 2)"), num(1.0));
        assert_eq!(eval("=MOD(3, -2)"), num(-1.0));
        assert_eq!(eval("=MOD(3, 0)"), Value::Error(ErrorCode::DivideByZero));
    }

    #[test]
    fn test_powers_and_logs() {
        assert_eq!(eval("=POWER(2, 10)"), num(1024.0));
        assert_eq!(eval("=POWER(0, -1)"), Value::Error(ErrorCode::DivideByZero));
        assert_eq!(eval("=POWER(-8, 0.5)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=SQRT(16)"), num(4.0));
        assert_eq!(eval("=SQRT(-1)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=LOG(100)"), num(2.0));
        assert_eq!(eval("=LOG(8, 2)"), num(3.0));
        assert_eq!(eval("=LOG(8, 1)"), Value::Error(ErrorCode::DivideByZero));
        assert_eq!(eval("=LOG10(1000)"), num(3.0));
        assert_eq!(eval("=LN(0)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=LN(EXP(2))"), num(2.0));
    }

    #[test]
    fn test_pi() {
        assert_eq!(eval("=PI()"), num(std::f64::consts::PI));
    }
}
