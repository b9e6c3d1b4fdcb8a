//! A1-style cell addresses and ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address such as `B7` or `$B$7`
///
/// Rows and columns are 0-based internally. The `$` markers are kept so a
/// formula can be printed back exactly as it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a relative cell address
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    /// Create a cell address with explicit absolute flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create a fully absolute address (`$A$1` style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    /// Parse an A1-style address
    ///
    /// # Examples
    /// ```
    /// use sheetcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("C4").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 2));
    ///
    /// let addr = CellAddress::parse("$B2").unwrap();
    /// assert!(addr.col_absolute);
    /// assert!(!addr.row_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let (col_absolute, rest) = match s.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if letters_end == 0 {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        let col = Self::letters_to_column(&rest[..letters_end])?;

        let rest = &rest[letters_end..];
        let (row_absolute, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        let row = row - 1;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            letters.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as an A1-style string, `$` markers included
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }

    /// Same cell, with the absolute flags dropped
    pub fn relative(&self) -> Self {
        Self::new(self.row, self.col)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
///
/// Always normalized so `start` is the top-left corner and `end` the
/// bottom-right one; each corner keeps its own absolute flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range from two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (top, bottom) = if a.row <= b.row { (a, b) } else { (b, a) };
        let (left, right) = if a.col <= b.col { (a, b) } else { (b, a) };

        Self {
            start: CellAddress::with_absolute(
                top.row,
                left.col,
                top.row_absolute,
                left.col_absolute,
            ),
            end: CellAddress::with_absolute(
                bottom.row,
                right.col,
                bottom.row_absolute,
                right.col_absolute,
            ),
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from `A1:B10` notation (a lone address is a 1x1 range)
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a cell position is within this range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Whether the range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Iterate over all cell positions in the range (row by row)
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            row: self.start.row,
            col: self.start.col,
            remaining: self.cell_count(),
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Row-major iterator over the positions of a [`CellRange`]
#[derive(Debug, Clone)]
pub struct CellRangeIterator {
    range: CellRange,
    row: u32,
    col: u16,
    remaining: u64,
}

impl Iterator for CellRangeIterator {
    type Item = (u32, u16);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let item = (self.row, self.col);
        if self.col >= self.range.end.col {
            self.col = self.range.start.col;
            self.row += 1;
        } else {
            self.col += 1;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIterator {}
