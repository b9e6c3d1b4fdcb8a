//! Formula Abstract Syntax Tree types
//!
//! Trees are immutable once built. Reference nodes keep the sheet names as
//! written, so the same tree resolves differently after the workbook's
//! sheets are renamed, moved or removed.

use sheetcalc_core::{CellAddress, CellRange, ErrorCode, Value};
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal; unknown names also parse to `#NAME?`
    Error(ErrorCode),

    // === References ===
    /// Single cell reference
    Reference(CellToken),
    /// Rectangular (possibly 3-D) range reference
    RangeReference(RangeToken),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<Expr> },
}

/// Coarse node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Literal,
    BinaryOp,
    UnaryOp,
    FunctionCall,
    Reference,
    RangeReference,
}

/// Cell reference with optional sheet qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellToken {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

/// `First` or `First:Last` sheet qualifier of a range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetSpan {
    pub first: String,
    pub last: Option<String>,
}

/// Range reference with optional sheet span
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeToken {
    pub sheets: Option<SheetSpan>,
    pub range: CellRange,
}

/// Borrowed view of a reference node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceToken<'a> {
    Cell(&'a CellToken),
    Range(&'a RangeToken),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl Expr {
    /// Literal node for a value; blank has no literal form and becomes `0`
    pub fn literal(value: Value) -> Self {
        match value {
            Value::Blank => Expr::Number(0.0),
            Value::Number(n) => Expr::Number(n),
            Value::Boolean(b) => Expr::Boolean(b),
            Value::Text(s) => Expr::Text(s.as_str().to_string()),
            Value::Error(e) => Expr::Error(e),
        }
    }

    /// Unqualified reference to a cell on the formula's own sheet
    pub fn cell(address: CellAddress) -> Self {
        Expr::Reference(CellToken {
            sheet: None,
            address,
        })
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function<S: Into<String>>(name: S, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) | Expr::Error(_) => {
                NodeKind::Literal
            }
            Expr::Reference(_) => NodeKind::Reference,
            Expr::RangeReference(_) => NodeKind::RangeReference,
            Expr::BinaryOp { .. } => NodeKind::BinaryOp,
            Expr::UnaryOp { .. } => NodeKind::UnaryOp,
            Expr::Function { .. } => NodeKind::FunctionCall,
        }
    }

    /// Value of a literal node
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            Expr::Number(n) => Some(Value::Number(*n)),
            Expr::Text(s) => Some(Value::text(s)),
            Expr::Boolean(b) => Some(Value::Boolean(*b)),
            Expr::Error(e) => Some(Value::Error(*e)),
            _ => None,
        }
    }

    /// Operator or function name; `None` for literals and references
    pub fn operator_name(&self) -> Option<&str> {
        match self {
            Expr::BinaryOp { op, .. } => Some(op.symbol()),
            Expr::UnaryOp { op, .. } => Some(op.symbol()),
            Expr::Function { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Direct children in left-to-right order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::UnaryOp { operand, .. } => vec![operand.as_ref()],
            Expr::Function { args, .. } => args.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// The reference token of a reference node
    pub fn reference_token(&self) -> Option<ReferenceToken<'_>> {
        match self {
            Expr::Reference(token) => Some(ReferenceToken::Cell(token)),
            Expr::RangeReference(token) => Some(ReferenceToken::Range(token)),
            _ => None,
        }
    }

    /// All reference tokens in the tree, in left-to-right order
    pub fn references(&self) -> References<'_> {
        References { stack: vec![self] }
    }
}

/// Iterator over the reference tokens of a tree
///
/// Walks with an explicit stack so very deep trees cannot overflow.
#[derive(Debug)]
pub struct References<'a> {
    stack: Vec<&'a Expr>,
}

impl<'a> Iterator for References<'a> {
    type Item = ReferenceToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(expr) = self.stack.pop() {
            match expr {
                Expr::Reference(token) => return Some(ReferenceToken::Cell(token)),
                Expr::RangeReference(token) => return Some(ReferenceToken::Range(token)),
                Expr::BinaryOp { left, right, .. } => {
                    self.stack.push(right.as_ref());
                    self.stack.push(left.as_ref());
                }
                Expr::UnaryOp { operand, .. } => self.stack.push(operand.as_ref()),
                Expr::Function { args, .. } => self.stack.extend(args.iter().rev()),
                _ => {}
            }
        }
        None
    }
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Concat => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 5,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 1
    }
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Percent => "%",
        }
    }
}

// === Formatting ===
//
// Display prints formula text without the leading '=' that reparses to an
// equal tree.

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", Value::Number(*n)),
            Expr::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expr::Boolean(true) => f.write_str("TRUE"),
            Expr::Boolean(false) => f.write_str("FALSE"),
            Expr::Error(e) => write!(f, "{}", e),
            Expr::Reference(token) => write!(f, "{}", token),
            Expr::RangeReference(token) => write!(f, "{}", token),
            Expr::BinaryOp { op, left, right } => {
                // Power is right-associative, everything else left-associative
                let (left_min, right_min) = if *op == BinaryOperator::Power {
                    (op.precedence() + 1, op.precedence())
                } else {
                    (op.precedence(), op.precedence() + 1)
                };
                write_operand(f, left, left_min)?;
                f.write_str(op.symbol())?;
                write_operand(f, right, right_min)
            }
            Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => {
                f.write_str("-")?;
                write_operand(f, operand, u8::MAX)
            }
            Expr::UnaryOp {
                op: UnaryOperator::Percent,
                operand,
            } => {
                match operand.as_ref() {
                    Expr::BinaryOp { .. }
                    | Expr::UnaryOp {
                        op: UnaryOperator::Negate,
                        ..
                    } => write!(f, "({})", operand)?,
                    other => write!(f, "{}", other)?,
                }
                f.write_str("%")
            }
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Write a child, parenthesized when it binds looser than `min_precedence`
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    let needs_parens = match expr {
        Expr::BinaryOp { op, .. } => op.precedence() < min_precedence,
        Expr::UnaryOp {
            op: UnaryOperator::Negate,
            ..
        } => min_precedence == u8::MAX,
        _ => false,
    };
    if needs_parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for CellToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write_sheet_prefix(f, sheet, None)?;
        }
        write!(f, "{}", self.address)
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.sheets {
            write_sheet_prefix(f, &span.first, span.last.as_deref())?;
        }
        write!(f, "{}", self.range.start)?;
        let three_d = self.sheets.as_ref().map_or(false, |s| s.last.is_some());
        if !(three_d && self.range.is_single_cell()) {
            write!(f, ":{}", self.range.end)?;
        }
        Ok(())
    }
}

fn write_sheet_prefix(f: &mut fmt::Formatter<'_>, first: &str, last: Option<&str>) -> fmt::Result {
    let quote = needs_quoting(first) || last.map_or(false, needs_quoting);
    if quote {
        f.write_str("'")?;
        f.write_str(&first.replace('\'', "''"))?;
        if let Some(last) = last {
            write!(f, ":{}", last.replace('\'', "''"))?;
        }
        f.write_str("'!")
    } else {
        f.write_str(first)?;
        if let Some(last) = last {
            write!(f, ":{}", last)?;
        }
        f.write_str("!")
    }
}

/// Sheet names that would not scan back as a bare identifier
fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    let keyword = name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE");
    !(starts_ok && rest_ok) || keyword
}
