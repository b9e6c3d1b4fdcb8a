//! Built-in spreadsheet functions
//!
//! Functions are plain `fn` pointers over already-evaluated arguments, so
//! they never see the workbook and cannot trigger evaluation themselves.
//! Errors a function wants to report as a cell value come back as
//! `Err(ErrorCode)`; the registry turns them into [`Value::Error`].

pub mod criteria;
pub mod date;
pub mod info;
pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use crate::error::FormulaResult;
use crate::evaluator::{coerce_bool, coerce_number, coerce_text, FormulaValue};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use sheetcalc_core::{ErrorCode, Value};
use std::sync::Arc;

/// Result of a built-in function
pub type FunctionResult = Result<Value, ErrorCode>;

/// Function implementation signature
pub type FunctionImpl = fn(&[FormulaValue]) -> FunctionResult;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Anything that can answer a function call by name
///
/// `None` means the name is unknown; the evaluator reports `#NAME?`.
/// Returning `Some(Err(_))` aborts the whole evaluation, so libraries
/// report ordinary failures as error values instead.
pub trait FunctionLibrary: Send + Sync {
    fn invoke(&self, name: &str, args: &[FormulaValue]) -> Option<FormulaResult<Value>>;
}

impl<T: FunctionLibrary + ?Sized> FunctionLibrary for &T {
    fn invoke(&self, name: &str, args: &[FormulaValue]) -> Option<FormulaResult<Value>> {
        (**self).invoke(name, args)
    }
}

impl<T: FunctionLibrary + ?Sized> FunctionLibrary for Arc<T> {
    fn invoke(&self, name: &str, args: &[FormulaValue]) -> Option<FormulaResult<Value>> {
        (**self).invoke(name, args)
    }
}

impl<T: FunctionLibrary + ?Sized> FunctionLibrary for Box<T> {
    fn invoke(&self, name: &str, args: &[FormulaValue]) -> Option<FormulaResult<Value>> {
        (**self).invoke(name, args)
    }
}

static SHARED: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Function registry
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_statistical_functions();
        registry.register_criteria_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_info_functions();
        registry.register_date_functions();

        registry
    }

    /// A registry with no functions at all
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Process-wide registry of the built-in functions
    pub fn shared() -> &'static FunctionRegistry {
        &SHARED
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any previous one of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    fn add(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation,
        });
    }

    fn register_math_functions(&mut self) {
        self.add("SUM", 1, None, math::fn_sum);
        self.add("SUMSQ", 1, None, math::fn_sumsq);
        self.add("PRODUCT", 1, None, math::fn_product);
        self.add("ABS", 1, Some(1), math::fn_abs);
        self.add("SIGN", 1, Some(1), math::fn_sign);
        self.add("INT", 1, Some(1), math::fn_int);
        self.add("TRUNC", 1, Some(2), math::fn_trunc);

        // ROUND family
        self.add("ROUND", 2, Some(2), math::fn_round);
        self.add("ROUNDUP", 2, Some(2), math::fn_roundup);
        self.add("ROUNDDOWN", 2, Some(2), math::fn_rounddown);
        self.add("CEILING", 2, Some(2), math::fn_ceiling);
        self.add("FLOOR", 2, Some(2), math::fn_floor);

        self.add("MOD", 2, Some(2), math::fn_mod);
        self.add("POWER", 2, Some(2), math::fn_power);
        self.add("SQRT", 1, Some(1), math::fn_sqrt);
        self.add("EXP", 1, Some(1), math::fn_exp);
        self.add("LN", 1, Some(1), math::fn_ln);
        self.add("LOG", 1, Some(2), math::fn_log);
        self.add("LOG10", 1, Some(1), math::fn_log10);
        self.add("PI", 0, Some(0), math::fn_pi);
    }

    fn register_statistical_functions(&mut self) {
        self.add("AVERAGE", 1, None, statistical::fn_average);
        self.add("AVERAGEA", 1, None, statistical::fn_averagea);
        self.add("MIN", 1, None, statistical::fn_min);
        self.add("MAX", 1, None, statistical::fn_max);
        self.add("MEDIAN", 1, None, statistical::fn_median);

        // Counting
        self.add("COUNT", 1, None, statistical::fn_count);
        self.add("COUNTA", 1, None, statistical::fn_counta);
        self.add("COUNTBLANK", 1, Some(1), statistical::fn_countblank);
    }

    fn register_criteria_functions(&mut self) {
        self.add("COUNTIF", 2, Some(2), criteria::fn_countif);
        self.add("SUMIF", 2, Some(3), criteria::fn_sumif);
        self.add("AVERAGEIF", 2, Some(3), criteria::fn_averageif);
    }

    fn register_logical_functions(&mut self) {
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
        self.add("XOR", 1, None, logical::fn_xor);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("IFERROR", 2, Some(2), logical::fn_iferror);
        self.add("IFNA", 2, Some(2), logical::fn_ifna);
        self.add("TRUE", 0, Some(0), logical::fn_true);
        self.add("FALSE", 0, Some(0), logical::fn_false);
    }

    fn register_text_functions(&mut self) {
        self.add("CONCATENATE", 1, None, text::fn_concatenate);
        self.add("CONCAT", 1, None, text::fn_concat);
        self.add("LEN", 1, Some(1), text::fn_len);
        self.add("UPPER", 1, Some(1), text::fn_upper);
        self.add("LOWER", 1, Some(1), text::fn_lower);
        self.add("TRIM", 1, Some(1), text::fn_trim);

        // Substrings
        self.add("LEFT", 1, Some(2), text::fn_left);
        self.add("RIGHT", 1, Some(2), text::fn_right);
        self.add("MID", 3, Some(3), text::fn_mid);

        self.add("REPT", 2, Some(2), text::fn_rept);
        self.add("EXACT", 2, Some(2), text::fn_exact);
        self.add("VALUE", 1, Some(1), text::fn_value);
        self.add("FIND", 2, Some(3), text::fn_find);
        self.add("SUBSTITUTE", 3, Some(4), text::fn_substitute);
    }

    fn register_info_functions(&mut self) {
        self.add("ISBLANK", 1, Some(1), info::fn_isblank);
        self.add("ISERROR", 1, Some(1), info::fn_iserror);
        self.add("ISERR", 1, Some(1), info::fn_iserr);
        self.add("ISNA", 1, Some(1), info::fn_isna);
        self.add("ISNUMBER", 1, Some(1), info::fn_isnumber);
        self.add("ISTEXT", 1, Some(1), info::fn_istext);
        self.add("ISLOGICAL", 1, Some(1), info::fn_islogical);
        self.add("NA", 0, Some(0), info::fn_na);
        self.add("ERROR.TYPE", 1, Some(1), info::fn_error_type);
    }

    fn register_date_functions(&mut self) {
        self.add("DATE", 3, Some(3), date::fn_date);
        self.add("YEAR", 1, Some(1), date::fn_year);
        self.add("MONTH", 1, Some(1), date::fn_month);
        self.add("DAY", 1, Some(1), date::fn_day);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionLibrary for FunctionRegistry {
    fn invoke(&self, name: &str, args: &[FormulaValue]) -> Option<FormulaResult<Value>> {
        let def = self.get(name)?;
        if !def.accepts(args.len()) {
            return Some(Ok(Value::Error(ErrorCode::InvalidValue)));
        }
        Some(Ok((def.implementation)(args).unwrap_or_else(Value::Error)))
    }
}

// === Argument helpers ===

/// Scalar reading of argument `index`; missing arguments are blank
pub(crate) fn arg(args: &[FormulaValue], index: usize) -> Value {
    args.get(index)
        .map(FormulaValue::to_scalar)
        .unwrap_or(Value::Blank)
}

/// Scalar argument, with an error value propagated
pub(crate) fn scalar_arg(args: &[FormulaValue], index: usize) -> Result<Value, ErrorCode> {
    match arg(args, index) {
        Value::Error(e) => Err(e),
        value => Ok(value),
    }
}

pub(crate) fn number_arg(args: &[FormulaValue], index: usize) -> Result<f64, ErrorCode> {
    coerce_number(&arg(args, index))
}

/// Numeric argument that may be omitted
pub(crate) fn optional_number_arg(
    args: &[FormulaValue],
    index: usize,
    default: f64,
) -> Result<f64, ErrorCode> {
    if index < args.len() {
        number_arg(args, index)
    } else {
        Ok(default)
    }
}

pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> Result<String, ErrorCode> {
    scalar_arg(args, index).map(|v| coerce_text(&v))
}

pub(crate) fn bool_arg(args: &[FormulaValue], index: usize) -> Result<bool, ErrorCode> {
    coerce_bool(&arg(args, index))
}

/// Numbers for the aggregates
///
/// Scalars are coerced. Inside ranges only numbers count; text, booleans
/// and blanks are skipped. The first error, left to right, wins.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> Result<Vec<f64>, ErrorCode> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Scalar(value) => numbers.push(coerce_number(value)?),
            FormulaValue::Range(range) => {
                for value in range.values() {
                    match value {
                        Value::Number(n) => numbers.push(*n),
                        Value::Error(e) => return Err(*e),
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(numbers)
}
