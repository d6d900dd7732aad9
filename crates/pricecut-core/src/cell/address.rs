//! Cell address and range types

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based internally; `A1` is `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: true,
            col_absolute: true,
        }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// ```
    /// use pricecut_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("F2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 5));
    ///
    /// let addr = CellAddress::parse("$D$10").unwrap();
    /// assert!(addr.row_absolute && addr.col_absolute);
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
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = Self::letters_to_column(&rest[..letters_end])?;

        let (row_absolute, digits) = match rest[letters_end..].strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, &rest[letters_end..]),
        };
        if digits.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
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
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }

        Ok(Self {
            row: row - 1,
            col,
            row_absolute,
            col_absolute,
        })
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
                return Err(Error::ColumnOutOfBounds(
                    col.min(u16::MAX as u32) as u16 - 1,
                    MAX_COLS - 1,
                ));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as A1-style string, honouring the absolute markers
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }

    /// Same cell with both markers set
    pub fn to_absolute(&self) -> Self {
        Self::absolute(self.row, self.col)
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
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
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range, normalized so `start` is the top-left corner
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        let (top, bottom) = if start.row <= end.row {
            (start, end)
        } else {
            (end, start)
        };
        let (left_col, right_col) = if start.col <= end.col {
            (start.col, end.col)
        } else {
            (end.col, start.col)
        };

        Self {
            start: CellAddress {
                row: top.row,
                col: left_col,
                ..top
            },
            end: CellAddress {
                row: bottom.row,
                col: right_col,
                ..bottom
            },
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// A single column between two rows, inclusive
    pub fn column_span(col: u16, first_row: u32, last_row: u32) -> Self {
        Self::from_indices(first_row, col, last_row, col)
    }

    /// Parse a range from A1:B10 notation (a lone address is a 1x1 range)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((start, end)) => {
                let start = CellAddress::parse(start)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellAddress::parse(end)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => {
                let addr = CellAddress::parse(s)?;
                Ok(Self {
                    start: addr,
                    end: addr,
                })
            }
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&addr.row)
            && (self.start.col..=self.end.col).contains(&addr.col)
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }

    /// Absolute reference qualified with a sheet name, as charts and
    /// defined names expect it: `'Sheet1'!$D$2:$D$4`.
    ///
    /// The sheet name is always quoted; embedded quotes are doubled.
    pub fn to_sheet_reference(&self, sheet_name: &str) -> String {
        let absolute = CellRange {
            start: self.start.to_absolute(),
            end: self.end.to_absolute(),
        };
        format!(
            "'{}'!{}",
            sheet_name.replace('\'', "''"),
            absolute.to_a1_string()
        )
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
