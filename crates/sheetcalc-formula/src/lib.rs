//! # sheetcalc-formula
//!
//! Formula language for sheetcalc.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Reference resolution against a workbook's sheet topology
//! - Tree evaluation against an [`EvaluationHost`]
//! - Built-in spreadsheet functions
//! - A reverse dependency index for invalidation
//!
//! Caching, cycle detection and invalidation policy live in the `sheetcalc`
//! engine, which implements [`EvaluationHost`].
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_formula::parse_formula;
//!
//! let ast = parse_formula("=SUM(Sheet2!$A$1:B3) * 2").unwrap();
//! assert_eq!(ast.to_string(), "SUM(Sheet2!$A$1:B3)*2");
//! assert_eq!(ast.references().count(), 1);
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use ast::{
    BinaryOperator, CellToken, Expr, NodeKind, RangeToken, ReferenceToken, SheetSpan,
    UnaryOperator,
};
pub use dependency::DependencyGraph;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate, evaluate_scalar, ComparisonOrder, EvaluationHost, FormulaValue, RangeValue,
};
pub use functions::{FunctionDef, FunctionImpl, FunctionLibrary, FunctionRegistry, FunctionResult};
pub use parser::parse_formula;
pub use resolver::{resolve, Resolved, ResolvedRange};
