//! Text functions
//!
//! Positions and lengths count characters, not bytes.

use super::{number_arg, optional_number_arg, scalar_arg, text_arg, FunctionResult};
use crate::evaluator::{coerce_text, parse_number, FormulaValue};
use sheetcalc_core::{ErrorCode, Value};

/// Longest text a function will build
const MAX_TEXT_LEN: usize = 32_767;

fn text_result(text: String) -> FunctionResult {
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(Value::text(text))
}

/// A character count argument; negative counts are `#VALUE!`
fn count_arg(args: &[FormulaValue], index: usize, default: f64) -> Result<usize, ErrorCode> {
    let n = optional_number_arg(args, index, default)?.trunc();
    if n < 0.0 {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(n as usize)
}

/// CONCATENATE(text1, ...) - Every argument must be a single value
pub fn fn_concatenate(args: &[FormulaValue]) -> FunctionResult {
    let mut out = String::new();
    for index in 0..args.len() {
        out.push_str(&text_arg(args, index)?);
    }
    text_result(out)
}

/// CONCAT(text1, ...) - Like CONCATENATE, but ranges are joined cell by cell
pub fn fn_concat(args: &[FormulaValue]) -> FunctionResult {
    let mut out = String::new();
    for value in args.iter().flat_map(FormulaValue::values) {
        if let Value::Error(e) = value {
            return Err(*e);
        }
        out.push_str(&coerce_text(value));
    }
    text_result(out)
}

pub fn fn_len(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Number(text_arg(args, 0)?.chars().count() as f64))
}

pub fn fn_upper(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::text(text_arg(args, 0)?.to_uppercase()))
}

pub fn fn_lower(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::text(text_arg(args, 0)?.to_lowercase()))
}

/// TRIM(text) - Strips the ends and collapses inner runs of spaces
pub fn fn_trim(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(args, 0)?;
    let trimmed: Vec<&str> = text.split(' ').filter(|s| !s.is_empty()).collect();
    Ok(Value::text(trimmed.join(" ")))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    Ok(Value::text(text.chars().take(n).collect::<String>()))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    let len = text.chars().count();
    Ok(Value::text(
        text.chars().skip(len.saturating_sub(n)).collect::<String>(),
    ))
}

/// MID(text, start_num, num_chars) - `start_num` is 1-based
pub fn fn_mid(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(args, 0)?;
    let start = number_arg(args, 1)?.trunc();
    let n = count_arg(args, 2, 0.0)?;
    if start < 1.0 {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(Value::text(
        text.chars()
            .skip(start as usize - 1)
            .take(n)
            .collect::<String>(),
    ))
}

/// REPT(text, number_times)
pub fn fn_rept(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(args, 0)?;
    let times = count_arg(args, 1, 0.0)?;
    if text.chars().count().saturating_mul(times) > MAX_TEXT_LEN {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(Value::text(text.repeat(times)))
}

/// EXACT(text1, text2) - Case-sensitive comparison
pub fn fn_exact(args: &[FormulaValue]) -> FunctionResult {
    Ok(Value::Boolean(text_arg(args, 0)? == text_arg(args, 1)?))
}

/// VALUE(text) - Converts numeric text to a number
pub fn fn_value(args: &[FormulaValue]) -> FunctionResult {
    match scalar_arg(args, 0)? {
        Value::Number(n) => Ok(Value::Number(n)),
        Value::Blank => Ok(Value::Number(0.0)),
        Value::Text(s) => parse_number(s.as_str())
            .map(Value::Number)
            .ok_or(ErrorCode::InvalidValue),
        _ => Err(ErrorCode::InvalidValue),
    }
}

/// FIND(find_text, within_text, [start_num]) - Case-sensitive, 1-based
pub fn fn_find(args: &[FormulaValue]) -> FunctionResult {
    let needle = text_arg(args, 0)?;
    let haystack = text_arg(args, 1)?;
    let start = optional_number_arg(args, 2, 1.0)?.trunc();

    let len = haystack.chars().count();
    if start < 1.0 || start as usize > len + 1 {
        return Err(ErrorCode::InvalidValue);
    }
    let skip = start as usize - 1;
    let byte_start = haystack
        .char_indices()
        .nth(skip)
        .map_or(haystack.len(), |(i, _)| i);

    let found = haystack[byte_start..]
        .find(&needle)
        .ok_or(ErrorCode::InvalidValue)?;
    let position = skip + haystack[byte_start..byte_start + found].chars().count() + 1;
    Ok(Value::Number(position as f64))
}

/// SUBSTITUTE(text, old_text, new_text, [instance_num])
pub fn fn_substitute(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(args, 0)?;
    let old = text_arg(args, 1)?;
    let new = text_arg(args, 2)?;

    if old.is_empty() {
        return Ok(Value::text(text));
    }
    if args.len() < 4 {
        return text_result(text.replace(&old, &new));
    }

    let instance = number_arg(args, 3)?.trunc();
    if instance < 1.0 {
        return Err(ErrorCode::InvalidValue);
    }
    match text.match_indices(&old).nth(instance as usize - 1) {
        Some((at, _)) => {
            let mut out = String::with_capacity(text.len() + new.len());
            out.push_str(&text[..at]);
            out.push_str(&new);
            out.push_str(&text[at + old.len()..]);
            text_result(out)
        }
        None => Ok(Value::text(text)),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{eval, TestHost};
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{ErrorCode, Value};

    fn text(s: &str) -> Value {
        Value::text(s)
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(eval("=CONCATENATE(\"a\", 1, TRUE)"), text("a1TRUE"));
        assert_eq!(eval("=CONCATENATE(0.1 + 0.2)"), text("0.3"));
        assert_eq!(
            eval("=CONCATENATE(\"a\", 1/0)"),
            Value::Error(ErrorCode::DivideByZero)
        );

        let mut host = TestHost::new();
        host.set("Sheet1", "A1", "x");
        host.set("Sheet1", "A2", 2.0);
        assert_eq!(host.eval("=CONCAT(A1:A3, \"!\")"), text("x2!"));
        assert_eq!(
            host.eval("=CONCATENATE(A1:A2)"),
            Value::Error(ErrorCode::InvalidValue)
        );
    }

    #[test]
    fn test_case_and_length() {
        assert_eq!(eval("=LEN(\"héllo\")"), Value::Number(5.0));
        assert_eq!(eval("=LEN(12.5)"), Value::Number(4.0));
        assert_eq!(eval("=UPPER(\"abc\")"), text("ABC"));
        assert_eq!(eval("=LOWER(\"ÀB\")"), text("àb"));
        assert_eq!(eval("=TRIM(\"  a   b  \")"), text("a b"));
    }

    #[test]
    fn test_substrings() {
        assert_eq!(eval("=LEFT(\"hello\")"), text("h"));
        assert_eq!(eval("=LEFT(\"hello\", 10)"), text("hello"));
        assert_eq!(eval("=RIGHT(\"hello\", 3)"), text("llo"));
        assert_eq!(eval("=MID(\"hello\", 2, 3)"), text("ell"));
        assert_eq!(eval("=MID(\"hello\", 9, 3)"), text(""));
        assert_eq!(eval("=MID(\"hello\", 0, 3)"), Value::Error(ErrorCode::InvalidValue));
        assert_eq!(eval("=LEFT(\"hello\", -1)"), Value::Error(ErrorCode::InvalidValue));
    }

    #[test]
    fn test_rept_and_exact() {
        assert_eq!(eval("=REPT(\"ab\", 3)"), text("ababab"));
        assert_eq!(eval("=REPT(\"ab\", 20000)"), Value::Error(ErrorCode::InvalidValue));
        assert_eq!(eval("=EXACT(\"a\", \"A\")"), Value::Boolean(false));
        assert_eq!(eval("=EXACT(\"1\", 1)"), Value::Boolean(true));
    }

    #[test]
    fn test_value() {
        assert_eq!(eval("=VALUE(\" 12.5 \")"), Value::Number(12.5));
        assert_eq!(eval("=VALUE(\"50%\")"), Value::Number(0.5));
        assert_eq!(eval("=VALUE(\"abc\")"), Value::Error(ErrorCode::InvalidValue));
        assert_eq!(eval("=VALUE(TRUE)"), Value::Error(ErrorCode::InvalidValue));
    }

    #[test]
    fn test_find() {
        assert_eq!(eval("=FIND(\"l\", \"hello\")"), Value::Number(3.0));
        assert_eq!(eval("=FIND(\"l\", \"hello\", 4)"), Value::Number(4.0));
        assert_eq!(eval("=FIND(\"ü\", \"grüße\")"), Value::Number(3.0));
        assert_eq!(eval("=FIND(\"L\", \"hello\")"), Value::Error(ErrorCode::InvalidValue));
        assert_eq!(eval("=FIND(\"\", \"hello\", 6)"), Value::Number(6.0));
        assert_eq!(eval("=FIND(\"h\", \"hello\", 7)"), Value::Error(ErrorCode::InvalidValue));
    }

    #[test]
    fn test_substitute() {
        assert_eq!(eval("=SUBSTITUTE(\"a-b-c\", \"-\", \"+\")"), text("a+b+c"));
        assert_eq!(eval("=SUBSTITUTE(\"a-b-c\", \"-\", \"+\", 2)"), text("a-b+c"));
        assert_eq!(eval("=SUBSTITUTE(\"a-b-c\", \"-\", \"+\", 3)"), text("a-b-c"));
        assert_eq!(eval("=SUBSTITUTE(\"abc\", \"\", \"x\")"), text("abc"));
    }
}
