//! Date functions
//!
//! Dates are serial day numbers in the 1900 date system: serial 1 is
//! 1900-01-01, and serial 60 is the fictional 1900-02-29 kept for
//! compatibility, so every later serial is one more than the real day count.

use super::{number_arg, FunctionResult};
use crate::evaluator::FormulaValue;
use chrono::{Datelike, Duration, NaiveDate};
use sheetcalc_core::{ErrorCode, Value};

/// Serial of 9999-12-31, the last representable date
const MAX_SERIAL: i64 = 2_958_465;

/// The fictional 1900-02-29
const PHANTOM_LEAP_DAY: i64 = 60;

fn epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 31)
}

fn serial_from_date(date: NaiveDate) -> Option<i64> {
    let days = (date - epoch()?).num_days();
    Some(if days >= PHANTOM_LEAP_DAY {
        days + 1
    } else {
        days
    })
}

/// Year, month and day of a serial; serial 0 reads as 1900-01-00
fn date_parts(serial: i64) -> Option<(i32, u32, u32)> {
    match serial {
        0 => Some((1900, 1, 0)),
        PHANTOM_LEAP_DAY => Some((1900, 2, 29)),
        s if s < 0 || s > MAX_SERIAL => None,
        s => {
            let days = if s > PHANTOM_LEAP_DAY { s - 1 } else { s };
            let date = epoch()?.checked_add_signed(Duration::days(days))?;
            Some((date.year(), date.month(), date.day()))
        }
    }
}

/// DATE(year, month, day)
///
/// Years 0 to 1899 are offset by 1900. Months and days outside their usual
/// range roll over into neighbouring months and years.
pub fn fn_date(args: &[FormulaValue]) -> FunctionResult {
    let mut year = number_arg(args, 0)?.trunc() as i64;
    let month = number_arg(args, 1)?.trunc() as i64;
    let day = number_arg(args, 2)?.trunc() as i64;

    if (0..1900).contains(&year) {
        year += 1900;
    }
    if !(0..=9999).contains(&year) {
        return Err(ErrorCode::NumericOverflow);
    }

    let total_months = year * 12 + month - 1;
    let first = i32::try_from(total_months.div_euclid(12))
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, total_months.rem_euclid(12) as u32 + 1, 1))
        .ok_or(ErrorCode::NumericOverflow)?;

    let serial = serial_from_date(first)
        .and_then(|start| start.checked_add(day - 1))
        .ok_or(ErrorCode::NumericOverflow)?;
    if !(0..=MAX_SERIAL).contains(&serial) {
        return Err(ErrorCode::NumericOverflow);
    }
    Ok(Value::Number(serial as f64))
}

fn parts_arg(args: &[FormulaValue]) -> Result<(i32, u32, u32), ErrorCode> {
    let serial = number_arg(args, 0)?.floor();
    if !(0.0..=MAX_SERIAL as f64).contains(&serial) {
        return Err(ErrorCode::NumericOverflow);
    }
    date_parts(serial as i64).ok_or(ErrorCode::NumericOverflow)
}

pub fn fn_year(args: &[FormulaValue]) -> FunctionResult {
    let (year, _, _) = parts_arg(args)?;
    Ok(Value::Number(year as f64))
}

pub fn fn_month(args: &[FormulaValue]) -> FunctionResult {
    let (_, month, _) = parts_arg(args)?;
    Ok(Value::Number(month as f64))
}

pub fn fn_day(args: &[FormulaValue]) -> FunctionResult {
    let (_, _, day) = parts_arg(args)?;
    Ok(Value::Number(day as f64))
}

#[cfg(test)]
mod tests {
    use crate::test_support::eval;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{ErrorCode, Value};

    #[test]
    fn test_date_serials() {
        assert_eq!(eval("=DATE(1900, 1, 1)"), Value::Number(1.0));
        assert_eq!(eval("=DATE(1900, 2, 28)"), Value::Number(59.0));
        assert_eq!(eval("=DATE(1900, 2, 29)"), Value::Number(60.0));
        assert_eq!(eval("=DATE(1900, 3, 1)"), Value::Number(61.0));
        assert_eq!(eval("=DATE(2024, 1, 15)"), Value::Number(45306.0));
        assert_eq!(eval("=DATE(9999, 12, 31)"), Value::Number(2_958_465.0));
    }

    #[test]
    fn test_date_rolls_over() {
        assert_eq!(eval("=DATE(2023, 13, 1)"), eval("=DATE(2024, 1, 1)"));
        assert_eq!(eval("=DATE(2024, 3, 0)"), eval("=DATE(2024, 2, 29)"));
        assert_eq!(eval("=DATE(2024, 0, 1)"), eval("=DATE(2023, 12, 1)"));
        assert_eq!(eval("=DATE(24, 1, 15)"), eval("=DATE(1924, 1, 15)"));
    }

    #[test]
    fn test_date_out_of_range() {
        assert_eq!(eval("=DATE(10000, 1, 1)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=DATE(-1, 1, 1)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=DATE(1900, 1, -5)"), Value::Error(ErrorCode::NumericOverflow));
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(eval("=YEAR(45306)"), Value::Number(2024.0));
        assert_eq!(eval("=MONTH(45306)"), Value::Number(1.0));
        assert_eq!(eval("=DAY(45306.75)"), Value::Number(15.0));
        assert_eq!(eval("=MONTH(60)"), Value::Number(2.0));
        assert_eq!(eval("=DAY(60)"), Value::Number(29.0));
        assert_eq!(eval("=DAY(61)"), Value::Number(1.0));
        assert_eq!(eval("=YEAR(-1)"), Value::Error(ErrorCode::NumericOverflow));
        assert_eq!(eval("=YEAR(\"x\")"), Value::Error(ErrorCode::InvalidValue));
    }
}
