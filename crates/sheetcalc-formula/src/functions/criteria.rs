//! Criteria matching for COUNTIF, SUMIF and AVERAGEIF
//!
//! A criterion can be:
//! - a number, boolean or error: matches equal values of that type
//! - text: case-insensitive match, `*` and `?` as wildcards, `~` escaping them
//! - a comparison such as `">5"`, `"<=10"`, `"<>0"` or `">b"`
//! - `""` or `"="`: matches blank cells and empty text; `"<>"` the reverse

use super::{arg, FunctionResult};
use crate::evaluator::{parse_number, FormulaValue};
use regex::{Regex, RegexBuilder};
use sheetcalc_core::{ErrorCode, Value};
use std::cmp::Ordering;

/// Criteria matcher built once per call and applied to every cell
#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug)]
enum CriteriaType {
    Number(f64),
    /// Numeric comparison; `<>` also matches anything that isn't a number
    Comparison(ComparisonOp, f64),
    Text(Pattern),
    /// `<>text`: everything the pattern does not match, blanks included
    NotText(Pattern),
    /// Ordering against text, only text cells take part
    TextComparison(ComparisonOp, String),
    Boolean(bool),
    Error(ErrorCode),
    Empty,
    NotEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

/// Case-insensitive text pattern
#[derive(Debug)]
struct Pattern {
    literal: String,
    wildcard: Option<Regex>,
}

impl Pattern {
    fn new(text: &str) -> Self {
        let literal = text.to_lowercase();
        let wildcard = if text.contains(['*', '?', '~']) {
            RegexBuilder::new(&wildcard_regex(text))
                .case_insensitive(true)
                .build()
                .ok()
        } else {
            None
        };
        Self { literal, wildcard }
    }

    fn matches(&self, text: &str) -> bool {
        match &self.wildcard {
            Some(regex) => regex.is_match(text),
            None => text.to_lowercase() == self.literal,
        }
    }
}

/// Anchored regex for a wildcard pattern
fn wildcard_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?s:");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '~' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push('~'),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push_str(")$");
    out
}

impl CriteriaMatcher {
    /// Create a matcher from the criteria argument's value
    pub fn new(criteria: &Value) -> Self {
        let criteria_type = match criteria {
            Value::Number(n) => CriteriaType::Number(*n),
            Value::Boolean(b) => CriteriaType::Boolean(*b),
            Value::Error(e) => CriteriaType::Error(*e),
            Value::Blank => CriteriaType::Empty,
            Value::Text(s) => Self::parse_text_criteria(s.as_str()),
        };

        Self { criteria_type }
    }

    fn parse_text_criteria(s: &str) -> CriteriaType {
        let (op, rest) = split_operator(s);

        if rest.is_empty() {
            return match op {
                None | Some(ComparisonOp::Equal) => CriteriaType::Empty,
                Some(ComparisonOp::NotEqual) => CriteriaType::NotEmpty,
                Some(op) => CriteriaType::TextComparison(op, String::new()),
            };
        }

        if let Some(n) = parse_number(rest) {
            return match op {
                None | Some(ComparisonOp::Equal) => CriteriaType::Number(n),
                Some(op) => CriteriaType::Comparison(op, n),
            };
        }

        match op {
            None | Some(ComparisonOp::Equal) => {
                if rest.eq_ignore_ascii_case("TRUE") {
                    CriteriaType::Boolean(true)
                } else if rest.eq_ignore_ascii_case("FALSE") {
                    CriteriaType::Boolean(false)
                } else if let Some(code) = ErrorCode::from_str(rest) {
                    CriteriaType::Error(code)
                } else {
                    CriteriaType::Text(Pattern::new(rest))
                }
            }
            Some(ComparisonOp::NotEqual) => CriteriaType::NotText(Pattern::new(rest)),
            Some(op) => CriteriaType::TextComparison(op, rest.to_lowercase()),
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &Value) -> bool {
        match &self.criteria_type {
            CriteriaType::Number(criteria) => {
                matches!(value, Value::Number(n) if n == criteria)
            }

            CriteriaType::Comparison(op, criteria) => match value {
                Value::Number(n) => n
                    .partial_cmp(criteria)
                    .map_or(false, |ordering| op.holds(ordering)),
                _ => *op == ComparisonOp::NotEqual,
            },

            CriteriaType::Text(pattern) => {
                matches!(value, Value::Text(s) if pattern.matches(s.as_str()))
            }

            CriteriaType::NotText(pattern) => {
                !matches!(value, Value::Text(s) if pattern.matches(s.as_str()))
            }

            CriteriaType::TextComparison(op, criteria) => match value {
                Value::Text(s) => op.holds(s.as_str().to_lowercase().cmp(criteria)),
                _ => false,
            },

            CriteriaType::Boolean(criteria) => matches!(value, Value::Boolean(b) if b == criteria),
            CriteriaType::Error(criteria) => matches!(value, Value::Error(e) if e == criteria),

            CriteriaType::Empty => match value {
                Value::Blank => true,
                Value::Text(s) => s.is_empty(),
                _ => false,
            },
            CriteriaType::NotEmpty => !value.is_blank(),
        }
    }
}

fn split_operator(s: &str) -> (Option<ComparisonOp>, &str) {
    const OPERATORS: [(&str, ComparisonOp); 6] = [
        (">=", ComparisonOp::GreaterEqual),
        ("<=", ComparisonOp::LessEqual),
        ("<>", ComparisonOp::NotEqual),
        (">", ComparisonOp::GreaterThan),
        ("<", ComparisonOp::LessThan),
        ("=", ComparisonOp::Equal),
    ];
    for (symbol, op) in OPERATORS {
        if let Some(rest) = s.strip_prefix(symbol) {
            return (Some(op), rest);
        }
    }
    (None, s)
}

/// The matcher for the criteria argument, which must be a single value
fn criteria_matcher(args: &[FormulaValue]) -> Result<CriteriaMatcher, ErrorCode> {
    if args.get(1).map_or(false, |c| c.cell_count() > 1) {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(CriteriaMatcher::new(&arg(args, 1)))
}

/// Values to aggregate for each matching position of the criteria range
///
/// Blank positions never contribute to an aggregate, so only populated
/// values are visited: the criteria range's own, or the sum range's when
/// one is given. A sum range of a different shape is read from its top-left
/// corner with the criteria range's offsets; positions it does not cover
/// are skipped.
fn matching_values(args: &[FormulaValue]) -> Result<Vec<Value>, ErrorCode> {
    let matcher = criteria_matcher(args)?;
    let Some(criteria) = args.first() else {
        return Ok(Vec::new());
    };

    let selected = match args.get(2) {
        None => criteria
            .values()
            .iter()
            .filter(|v| matcher.matches(v))
            .cloned()
            .collect(),
        Some(sum) => sum
            .entries()
            .filter(|&(position, _)| {
                aligned(sum, criteria, position)
                    .and_then(|index| criteria.value_at(index))
                    .map_or(false, |v| matcher.matches(v))
            })
            .map(|(_, value)| value.clone())
            .collect(),
    };
    Ok(selected)
}

/// Position in the criteria range lined up with a sum range position
fn aligned(sum: &FormulaValue, criteria: &FormulaValue, position: u64) -> Option<u64> {
    match (sum, criteria) {
        (FormulaValue::Range(sum), FormulaValue::Range(criteria)) if !sum.same_shape(criteria) => {
            let (sum_cols, cols) = (sum.cols() as u64, criteria.cols() as u64);
            let (row, col) = (position / sum_cols, position % sum_cols);
            if row >= sum.rows() as u64 || col >= cols {
                return None;
            }
            Some(row * cols + col)
        }
        _ => Some(position),
    }
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FormulaValue]) -> FunctionResult {
    let matcher = criteria_matcher(args)?;
    let Some(range) = args.first() else {
        return Ok(Value::Number(0.0));
    };
    let mut count = range.values().iter().filter(|v| matcher.matches(v)).count() as u64;
    if matcher.matches(&Value::Blank) {
        count += range.blank_count();
    }
    Ok(Value::Number(count as f64))
}

/// SUMIF(range, criteria, [sum_range])
///
/// Only numbers are summed; an error in a summed position propagates.
pub fn fn_sumif(args: &[FormulaValue]) -> FunctionResult {
    let numbers = numbers_of(&matching_values(args)?)?;
    Ok(Value::Number(numbers.iter().sum()))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(args: &[FormulaValue]) -> FunctionResult {
    let numbers = numbers_of(&matching_values(args)?)?;
    if numbers.is_empty() {
        return Err(ErrorCode::DivideByZero);
    }
    Ok(Value::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

fn numbers_of(values: &[Value]) -> Result<Vec<f64>, ErrorCode> {
    let mut numbers = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Number(n) => numbers.push(*n),
            Value::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHost;
    use pretty_assertions::assert_eq;

    fn matcher(criteria: impl Into<Value>) -> CriteriaMatcher {
        CriteriaMatcher::new(&criteria.into())
    }

    #[test]
    fn test_number_criteria() {
        let m = matcher(5.0);
        assert!(m.matches(&Value::Number(5.0)));
        assert!(!m.matches(&Value::text("5")));
        assert!(!m.matches(&Value::Number(4.0)));

        let m = matcher("5");
        assert!(m.matches(&Value::Number(5.0)));
    }

    #[test]
    fn test_comparison_criteria() {
        let m = matcher(">=10");
        assert!(m.matches(&Value::Number(10.0)));
        assert!(!m.matches(&Value::Number(9.0)));
        assert!(!m.matches(&Value::text("20")));

        let m = matcher("<>0");
        assert!(m.matches(&Value::Number(1.0)));
        assert!(m.matches(&Value::text("x")));
        assert!(m.matches(&Value::Blank));
        assert!(!m.matches(&Value::Number(0.0)));
    }

    #[test]
    fn test_text_criteria() {
        let m = matcher("apple");
        assert!(m.matches(&Value::text("APPLE")));
        assert!(!m.matches(&Value::text("apples")));

        let m = matcher("<>apple");
        assert!(m.matches(&Value::text("pear")));
        assert!(m.matches(&Value::Blank));
        assert!(!m.matches(&Value::text("Apple")));

        let m = matcher(">m");
        assert!(m.matches(&Value::text("pear")));
        assert!(!m.matches(&Value::text("apple")));
        assert!(!m.matches(&Value::Number(1.0)));
    }

    #[test]
    fn test_wildcards() {
        let m = matcher("a*e");
        assert!(m.matches(&Value::text("apple")));
        assert!(m.matches(&Value::text("Ae")));
        assert!(!m.matches(&Value::text("apples")));

        let m = matcher("b?t");
        assert!(m.matches(&Value::text("bat")));
        assert!(!m.matches(&Value::text("boat")));

        let m = matcher("what~?");
        assert!(m.matches(&Value::text("what?")));
        assert!(!m.matches(&Value::text("whats")));

        let m = matcher("1+1*");
        assert!(m.matches(&Value::text("1+1=2")));
    }

    #[test]
    fn test_empty_criteria() {
        let m = matcher("");
        assert!(m.matches(&Value::Blank));
        assert!(m.matches(&Value::text("")));
        assert!(!m.matches(&Value::Number(0.0)));

        let m = matcher("<>");
        assert!(m.matches(&Value::Number(0.0)));
        assert!(!m.matches(&Value::Blank));
    }

    #[test]
    fn test_boolean_and_error_criteria() {
        assert!(matcher(true).matches(&Value::Boolean(true)));
        assert!(matcher("false").matches(&Value::Boolean(false)));
        assert!(!matcher(true).matches(&Value::Number(1.0)));
        assert!(matcher("#N/A").matches(&Value::Error(ErrorCode::NotApplicable)));
    }

    fn fruit() -> TestHost {
        let mut host = TestHost::new();
        for (row, (name, qty)) in [("apple", 3.0), ("pear", 5.0), ("apple", 7.0), ("plum", 11.0)]
            .into_iter()
            .enumerate()
        {
            host.set("Sheet1", &format!("A{}", row + 1), name);
            host.set("Sheet1", &format!("B{}", row + 1), qty);
        }
        host
    }

    #[test]
    fn test_countif() {
        let mut host = fruit();
        assert_eq!(host.eval("=COUNTIF(A1:A4, \"apple\")"), Value::Number(2.0));
        assert_eq!(host.eval("=COUNTIF(A1:A4, \"p*\")"), Value::Number(2.0));
        assert_eq!(host.eval("=COUNTIF(B1:B4, \">4\")"), Value::Number(3.0));
        assert_eq!(host.eval("=COUNTIF(A1:A6, \"\")"), Value::Number(2.0));
        assert_eq!(
            host.eval("=COUNTIF(A1:A4, B1:B2)"),
            Value::Error(ErrorCode::InvalidValue)
        );
    }

    #[test]
    fn test_sumif() {
        let mut host = fruit();
        assert_eq!(host.eval("=SUMIF(A1:A4, \"apple\", B1:B4)"), Value::Number(10.0));
        assert_eq!(host.eval("=SUMIF(B1:B4, \">4\")"), Value::Number(23.0));
        // A smaller sum range is read from its top-left corner; rows past it are skipped
        assert_eq!(host.eval("=SUMIF(A1:A4, \"apple\", B1:B2)"), Value::Number(3.0));
        assert_eq!(host.eval("=SUMIF(A1:A4, \"kiwi\", B1:B4)"), Value::Number(0.0));
    }

    #[test]
    fn test_criteria_over_whole_columns() {
        let mut host = fruit();
        assert_eq!(host.eval("=COUNTIF(A1:A1048576, \"apple\")"), Value::Number(2.0));
        assert_eq!(host.eval("=COUNTIF(A1:A1048576, \"\")"), Value::Number(1_048_572.0));
        assert_eq!(host.eval("=SUMIF(A1:A1048576, \"p*\", B1:B1048576)"), Value::Number(16.0));
        // Blank criteria cells line up with populated sum cells
        host.set("Sheet1", "B9", 100.0);
        assert_eq!(host.eval("=SUMIF(A1:A1048576, \"\", B1:B1048576)"), Value::Number(100.0));
        assert_eq!(host.eval("=COUNTBLANK(B1:B10)"), Value::Number(5.0));
    }

    #[test]
    fn test_sumif_propagates_summed_errors() {
        let mut host = fruit();
        host.set_formula("Sheet1", "B2", "=1/0");
        assert_eq!(host.eval("=SUMIF(A1:A4, \"apple\", B1:B4)"), Value::Number(10.0));
        assert_eq!(
            host.eval("=SUMIF(A1:A4, \"pear\", B1:B4)"),
            Value::Error(ErrorCode::DivideByZero)
        );
    }

    #[test]
    fn test_averageif() {
        let mut host = fruit();
        assert_eq!(host.eval("=AVERAGEIF(A1:A4, \"apple\", B1:B4)"), Value::Number(5.0));
        assert_eq!(
            host.eval("=AVERAGEIF(A1:A4, \"kiwi\", B1:B4)"),
            Value::Error(ErrorCode::DivideByZero)
        );
    }
}
