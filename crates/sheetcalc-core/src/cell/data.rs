//! What a sheet stores at one position

use super::Value;
use crate::error::{Error, Result};
use std::fmt;

/// Kind tag a cell reports to callers
///
/// A formula cell always reports [`CellKind::Formula`], whatever type its
/// last result had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    Blank,
    Numeric,
    Boolean,
    Text,
    Error,
    Formula,
}

impl CellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Blank => "blank",
            CellKind::Numeric => "numeric",
            CellKind::Boolean => "boolean",
            CellKind::Text => "text",
            CellKind::Error => "error",
            CellKind::Formula => "formula",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formula text plus the last result stored for it
///
/// The cache validity flag lives here. While it is cleared the stored
/// result is withheld from callers.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    text: String,
    cached: Option<Value>,
    cache_valid: bool,
}

impl FormulaCell {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            cached: None,
            cache_valid: false,
        }
    }

    /// Formula text as entered (e.g., "=SUM(A1:A10)")
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last stored result, if it is still valid
    pub fn cached_value(&self) -> Option<&Value> {
        if self.cache_valid {
            self.cached.as_ref()
        } else {
            None
        }
    }

    pub fn is_cache_valid(&self) -> bool {
        self.cache_valid
    }

    /// Store a result and mark it valid
    pub fn set_cached_result(&mut self, value: Value) {
        self.cached = Some(value);
        self.cache_valid = true;
    }

    /// Clear the validity flag; returns whether it was set
    pub fn invalidate(&mut self) -> bool {
        std::mem::replace(&mut self.cache_valid, false)
    }
}

/// Cell content: a literal value or a formula
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Input cell holding a literal
    Plain(Value),
    /// Formula cell with its stored result
    Formula(FormulaCell),
}

impl Cell {
    /// Create a formula cell with no stored result
    pub fn formula<S: Into<String>>(text: S) -> Self {
        Cell::Formula(FormulaCell::new(text))
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Plain(value) => value.kind(),
            Cell::Formula(_) => CellKind::Formula,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Cell::Formula(_))
    }

    /// The literal held by a plain cell
    pub fn value(&self) -> Option<&Value> {
        match self {
            Cell::Plain(value) => Some(value),
            Cell::Formula(_) => None,
        }
    }

    pub fn formula_text(&self) -> Option<&str> {
        match self {
            Cell::Formula(f) => Some(f.text()),
            Cell::Plain(_) => None,
        }
    }

    /// Valid stored result of a formula cell
    pub fn cached_value(&self) -> Option<&Value> {
        match self {
            Cell::Formula(f) => f.cached_value(),
            Cell::Plain(_) => None,
        }
    }

    /// What a caller sees without evaluating: the literal of a plain cell,
    /// the valid stored result of a formula cell
    pub fn visible_value(&self) -> Option<&Value> {
        match self {
            Cell::Plain(value) => Some(value),
            Cell::Formula(f) => f.cached_value(),
        }
    }

    /// Store a formula result on this cell
    ///
    /// Fails for plain cells; only formula cells carry a result slot.
    pub fn set_cached_result(&mut self, value: Value) -> Result<()> {
        match self {
            Cell::Formula(f) => {
                f.set_cached_result(value);
                Ok(())
            }
            Cell::Plain(v) => Err(Error::UnsupportedCellKind {
                operation: "set_cached_result",
                kind: v.kind(),
            }),
        }
    }

    /// Clear a formula cell's validity flag; returns whether it was set
    pub fn invalidate(&mut self) -> bool {
        match self {
            Cell::Formula(f) => f.invalidate(),
            Cell::Plain(_) => false,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Plain(Value::Blank)
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::Plain(value)
    }
}
