//! Formula parser
//!
//! A recursive descent parser for spreadsheet formulas with proper operator
//! precedence. Sheet qualifiers, 3-D spans and `$` absolute markers are kept
//! on the reference tokens; resolving them against a workbook happens later.

use crate::ast::{BinaryOperator, CellToken, Expr, RangeToken, SheetSpan, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use sheetcalc_core::{CellAddress, CellRange, ErrorCode};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use sheetcalc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF('My Sheet'!A1>0,\"Yes\",\"No\")").unwrap();
/// assert!(parse_formula("1+2").is_err());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Expr> {
    let formula = formula.trim();

    let formula = formula
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;

    if !matches!(parser.current_token(), Token::Eof) {
        return Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(ErrorCode),

    // Identifiers and references
    Identifier(String),  // Function name, or an unknown name
    CellRef(String),     // Cell reference like A1, $A$1
    SheetRef(SheetSpan), // Sheet1! or Sheet1:Sheet3! or 'My Sheet'!

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    /// Character that starts no token
    Invalid(char),

    // End of input
    Eof,
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<Token>,
    /// The last scanned token was a sheet prefix
    after_sheet: bool,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
            after_sheet: false,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        let token = self.scan_token();
        self.after_sheet = matches!(token, Token::SheetRef(_));
        self.current_token = Some(token);
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::LessEqual;
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Token::NotEqual;
            }
            return Token::LessThan;
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::GreaterEqual;
            }
            return Token::GreaterThan;
        }

        if c == '"' {
            return self.scan_string();
        }

        if c == '\'' {
            return self.scan_quoted_sheet();
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c == '#' {
            return self.scan_error();
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return self.scan_identifier_or_ref();
        }

        self.advance();
        Token::Invalid(c)
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Token::String(s);
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Token::Invalid('"'),
            }
        }
    }

    /// `'Sheet name'!` or `'First:Last'!`; `''` escapes a quote
    fn scan_quoted_sheet(&mut self) -> Token {
        self.advance(); // opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Token::Invalid('\''),
            }
        }

        if self.peek_char() != Some('!') {
            return Token::Invalid('\'');
        }
        self.advance();

        // sheet names cannot contain ':', so it always separates a span
        let span = match name.split_once(':') {
            Some((first, last)) => SheetSpan {
                first: first.to_string(),
                last: Some(last.to_string()),
            },
            None => SheetSpan {
                first: name,
                last: None,
            },
        };
        if span.first.is_empty() || span.last.as_deref() == Some("") {
            return Token::Invalid('\'');
        }
        Token::SheetRef(span)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            self.skip_digits();
        }

        let num_str = &self.input[start..self.pos];
        match num_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(num_str.chars().last().unwrap_or('.')),
        }
    }

    fn scan_error(&mut self) -> Token {
        let start = self.pos;
        self.advance();
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
        }) {
            self.advance();
        }
        match ErrorCode::from_str(&self.input[start..self.pos]) {
            Some(code) => Token::Error(code),
            None => Token::Invalid('#'),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;
        self.skip_identifier_chars();
        let text = &self.input[start..self.pos];

        // Sheet1!
        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetRef(SheetSpan {
                first: text.to_string(),
                last: None,
            });
        }

        // Sheet1:Sheet3! - otherwise the colon is a range operator. In
        // Data!A1:Data!B2 the text before the colon is a cell, not a sheet.
        if !self.after_sheet && self.peek_char() == Some(':') {
            let checkpoint = self.pos;
            self.advance();
            let last_start = self.pos;
            self.skip_identifier_chars();
            let last = &self.input[last_start..self.pos];
            if !last.is_empty() && self.peek_char() == Some('!') {
                self.advance();
                return Token::SheetRef(SheetSpan {
                    first: text.to_string(),
                    last: Some(last.to_string()),
                });
            }
            self.pos = checkpoint;
        }

        // TRUE( and FALSE( are function calls
        let is_call = self.peek_char() == Some('(');
        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
            // LOG10( is a function even though LOG10 looks like a cell
            if CellAddress::parse(text).is_ok() {
                return Token::CellRef(text.to_string());
            }
        }

        Token::Identifier(text.to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_identifier_chars(&mut self) {
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
        }) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^ (right associative)
    // 6. Unary: prefix -, postfix %
    // 7. Range: :
    // 8. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = Expr::binary(BinaryOperator::Concat, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<Expr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.parse_exponent()?; // Right associative
            return Ok(Expr::binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus is a no-op
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            return self.parse_unary();
        }

        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = Expr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<Expr> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Token::Colon) {
            return Ok(left);
        }
        self.consume();
        let right = self.parse_primary()?;

        match (left, right) {
            (Expr::Reference(start), Expr::Reference(end)) => {
                let sheet = match (start.sheet, end.sheet) {
                    (sheet, None) => sheet,
                    (Some(a), Some(b)) if a.eq_ignore_ascii_case(&b) => Some(a),
                    _ => {
                        return Err(FormulaError::Parse(
                            "Range endpoints must be on the same sheet".into(),
                        ))
                    }
                };
                Ok(Expr::RangeReference(RangeToken {
                    sheets: sheet.map(|first| SheetSpan { first, last: None }),
                    range: CellRange::new(start.address, end.address),
                }))
            }
            // Sheet1:Sheet3!A1 followed by :B2
            (Expr::RangeReference(start), Expr::Reference(end))
                if start.range.is_single_cell() && end.sheet.is_none() =>
            {
                Ok(Expr::RangeReference(RangeToken {
                    sheets: start.sheets,
                    range: CellRange::new(start.range.start, end.address),
                }))
            }
            _ => Err(FormulaError::Parse(
                "Range operator needs cell references on both sides".into(),
            )),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.consume() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::String(s) => Ok(Expr::Text(s)),
            Token::Boolean(b) => Ok(Expr::Boolean(b)),
            Token::Error(e) => Ok(Expr::Error(e)),

            Token::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::SheetRef(span) => self.parse_sheet_reference(span),

            Token::CellRef(text) => Ok(Expr::Reference(CellToken {
                sheet: None,
                address: parse_address(&text)?,
            })),

            Token::Identifier(name) => {
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    // names are not supported
                    Ok(Expr::Error(ErrorCode::NameNotFound))
                }
            }

            Token::Invalid(c) => Err(FormulaError::Parse(format!(
                "Unexpected character '{}'",
                c
            ))),

            other => Err(FormulaError::Parse(format!("Unexpected token: {:?}", other))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(Expr::function(name.to_uppercase(), args))
    }

    fn parse_sheet_reference(&mut self, span: SheetSpan) -> FormulaResult<Expr> {
        let address = match self.consume() {
            Token::CellRef(text) => parse_address(&text)?,
            other => {
                return Err(FormulaError::Parse(format!(
                    "Expected cell reference after sheet name, got {:?}",
                    other
                )))
            }
        };

        if span.last.is_some() {
            Ok(Expr::RangeReference(RangeToken {
                sheets: Some(span),
                range: CellRange::single(address),
            }))
        } else {
            Ok(Expr::Reference(CellToken {
                sheet: Some(span.first),
                address,
            }))
        }
    }
}

fn parse_address(text: &str) -> FormulaResult<CellAddress> {
    CellAddress::parse(text).map_err(|e| {
        FormulaError::Parse(format!("Invalid cell reference '{}': {}", text, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(sheets: Option<SheetSpan>, a1: &str) -> Expr {
        Expr::RangeReference(RangeToken {
            sheets,
            range: CellRange::parse(a1).unwrap(),
        })
    }

    fn span(first: &str, last: Option<&str>) -> Option<SheetSpan> {
        Some(SheetSpan {
            first: first.into(),
            last: last.map(Into::into),
        })
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("=42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse_formula("=3.14").unwrap(), Expr::Number(3.14));
        assert_eq!(parse_formula("=1e10").unwrap(), Expr::Number(1e10));
        assert_eq!(parse_formula("=.5").unwrap(), Expr::Number(0.5));
        assert!(parse_formula("=1e").is_err());
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_formula("=\"Hello\"").unwrap(), Expr::Text("Hello".into()));
        assert_eq!(
            parse_formula("=\"Hello \"\"World\"\"\"").unwrap(),
            Expr::Text("Hello \"World\"".into())
        );
        assert!(parse_formula("=\"unterminated").is_err());
    }

    #[test]
    fn test_parse_boolean_and_error() {
        assert_eq!(parse_formula("=TRUE").unwrap(), Expr::Boolean(true));
        assert_eq!(parse_formula("=false").unwrap(), Expr::Boolean(false));
        assert_eq!(
            parse_formula("=#DIV/0!").unwrap(),
            Expr::Error(ErrorCode::DivideByZero)
        );
        assert_eq!(
            parse_formula("=#N/A").unwrap(),
            Expr::Error(ErrorCode::NotApplicable)
        );
        assert!(parse_formula("=#BOGUS!").is_err());
    }

    #[test]
    fn test_parse_precedence() {
        let ast = parse_formula("=1+2*3").unwrap();
        assert_eq!(
            ast,
            Expr::binary(
                BinaryOperator::Add,
                Expr::Number(1.0),
                Expr::binary(BinaryOperator::Multiply, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );

        let ast = parse_formula("=2^3^2").unwrap();
        assert_eq!(
            ast,
            Expr::binary(
                BinaryOperator::Power,
                Expr::Number(2.0),
                Expr::binary(BinaryOperator::Power, Expr::Number(3.0), Expr::Number(2.0)),
            )
        );

        let ast = parse_formula("=\"a\"&1+1=\"a2\"").unwrap();
        assert_eq!(ast.operator_name(), Some("="));
        assert_eq!(ast.children()[0].operator_name(), Some("&"));
    }

    #[test]
    fn test_parse_unary() {
        let ast = parse_formula("=-5%").unwrap();
        assert_eq!(
            ast,
            Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(Expr::UnaryOp {
                    op: UnaryOperator::Percent,
                    operand: Box::new(Expr::Number(5.0)),
                }),
            }
        );
        assert_eq!(parse_formula("=+7").unwrap(), Expr::Number(7.0));
    }

    #[test]
    fn test_parse_cell_reference_keeps_absolute_flags() {
        let ast = parse_formula("=$B2").unwrap();
        match ast {
            Expr::Reference(token) => {
                assert_eq!(token.sheet, None);
                assert_eq!(token.address, CellAddress::with_absolute(1, 1, false, true));
            }
            other => panic!("Expected reference, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sheet_references() {
        assert_eq!(
            parse_formula("=Sheet2!A1").unwrap(),
            Expr::Reference(CellToken {
                sheet: Some("Sheet2".into()),
                address: CellAddress::new(0, 0),
            })
        );
        assert_eq!(
            parse_formula("='My Sheet'!A1").unwrap(),
            Expr::Reference(CellToken {
                sheet: Some("My Sheet".into()),
                address: CellAddress::new(0, 0),
            })
        );
        assert_eq!(
            parse_formula("='O''Brien'!C3").unwrap().to_string(),
            "'O''Brien'!C3"
        );
        assert!(parse_formula("=''!A1").is_err());
        assert!(parse_formula("=Sheet2!").is_err());
    }

    #[test]
    fn test_parse_ranges() {
        assert_eq!(parse_formula("=A1:B10").unwrap(), range(None, "A1:B10"));
        assert_eq!(parse_formula("=B10:A1").unwrap(), range(None, "A1:B10"));
        assert_eq!(
            parse_formula("=Data!A1:B2").unwrap(),
            range(span("Data", None), "A1:B2")
        );
        assert_eq!(
            parse_formula("=Data!A1:data!B2").unwrap(),
            range(span("Data", None), "A1:B2")
        );
        assert!(parse_formula("=Data!A1:Other!B2").is_err());
        assert!(parse_formula("=1:2").is_err());
    }

    #[test]
    fn test_parse_range_with_sheet_on_both_ends() {
        assert_eq!(
            parse_formula("=Sheet2!A1:Sheet2!B2").unwrap(),
            range(span("Sheet2", None), "A1:B2")
        );
        assert_eq!(
            parse_formula("=SUM(Data!A1:Data!A3)").unwrap(),
            Expr::function("SUM", vec![range(span("Data", None), "A1:A3")])
        );
        // The span lookahead still applies at the start of a reference
        assert_eq!(
            parse_formula("=Sheet1:Sheet3!A1+Data!B1").unwrap().references().count(),
            2
        );
    }

    #[test]
    fn test_parse_three_d_references() {
        assert_eq!(
            parse_formula("=SUM(Sheet1:Sheet3!A1:B2)").unwrap(),
            Expr::function("SUM", vec![range(span("Sheet1", Some("Sheet3")), "A1:B2")])
        );
        assert_eq!(
            parse_formula("=Sheet1:Sheet3!B5").unwrap(),
            range(span("Sheet1", Some("Sheet3")), "B5:B5")
        );
        assert_eq!(
            parse_formula("='Jan:Mar'!A1").unwrap(),
            range(span("Jan", Some("Mar")), "A1:A1")
        );
    }

    #[test]
    fn test_parse_function() {
        let ast = parse_formula("=sum(1, 2, A1:A3)").unwrap();
        match &ast {
            Expr::Function { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 3);
                assert_eq!(args[2], range(None, "A1:A3"));
            }
            other => panic!("Expected function, got {:?}", other),
        }

        assert_eq!(parse_formula("=PI()").unwrap(), Expr::function("PI", vec![]));
        assert_eq!(
            parse_formula("=LOG10(100)").unwrap(),
            Expr::function("LOG10", vec![Expr::Number(100.0)])
        );
        assert_eq!(
            parse_formula("=ERROR.TYPE(#N/A)").unwrap(),
            Expr::function("ERROR.TYPE", vec![Expr::Error(ErrorCode::NotApplicable)])
        );
        assert_eq!(
            parse_formula("=TRUE()").unwrap(),
            Expr::function("TRUE", vec![])
        );
    }

    #[test]
    fn test_unknown_name_is_name_error() {
        assert_eq!(
            parse_formula("=Revenue").unwrap(),
            Expr::Error(ErrorCode::NameNotFound)
        );
        // beyond the last column, so not a cell
        assert_eq!(
            parse_formula("=XFE1").unwrap(),
            Expr::Error(ErrorCode::NameNotFound)
        );
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_formula("1+2").is_err());
        assert!(parse_formula("=").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=1 2").is_err());
        assert!(parse_formula("=1@2").is_err());
        assert!(parse_formula("={1,2}").is_err());
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        let formulas = [
            "=(1+2)*3",
            "=1-(2-3)",
            "=2^-1",
            "=-A1%",
            "=IF($A$1>=0,\"yes\",\"no \"\"quoted\"\"\")",
            "=SUM('My Data'!A1:B3,Sheet1:Sheet3!C1)&\"x\"",
            "=-(1+2)",
            "=(1&2)=\"12\"",
        ];
        for text in formulas {
            let ast = parse_formula(text).unwrap();
            let printed = format!("={}", ast);
            assert_eq!(parse_formula(&printed).unwrap(), ast, "{}", printed);
        }
    }
}
