//! Cell address and range types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// Encode a 1-based column number as bijective base-26 letters (1 = A, 27 = AA).
///
/// Zero has no digit in this numbering and encodes as the empty string.
///
/// ```
/// use tabula_core::cell::column_letters;
///
/// assert_eq!(column_letters(1), "A");
/// assert_eq!(column_letters(703), "AAA");
/// ```
pub fn column_letters(n: u32) -> String {
    let mut buf = Vec::with_capacity(4);
    let mut n = n;

    while n > 0 {
        n -= 1;
        buf.push(b'A' + (n % 26) as u8);
        n /= 26;
    }

    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Decode bijective base-26 letters into a 1-based column number.
pub fn column_number(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{}'",
                c
            )));
        }
        n = n
            .checked_mul(26)
            .and_then(|v| v.checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
            .ok_or_else(|| Error::InvalidAddress(format!("column '{}' too large", letters)))?;
    }

    Ok(n)
}

/// A zero-based cell coordinate.
///
/// Field order makes the derived ordering row-major: (row, column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
}

impl CellAddress {
    /// Create an address from a (column, row) pair
    pub const fn new(col: u16, row: u32) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// `$` markers are accepted and ignored.
    ///
    /// # Examples
    /// ```
    /// use tabula_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$3").unwrap();
    /// assert_eq!(addr, CellAddress::new(1, 2));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }

        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = column_number(&s[col_start..pos])? - 1;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // Excel rows are 1-based, we use 0-based internally
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

        if col >= MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }

        Ok(Self {
            row,
            col: col as u16,
        })
    }

    /// Column letters for this address (0 = A)
    pub fn column_letters(&self) -> String {
        column_letters(self.col as u32 + 1)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", self.column_letters(), self.row + 1)
    }

    /// Format as an absolute reference (`$A$1`)
    pub fn to_absolute_string(&self) -> String {
        format!("${}${}", self.column_letters(), self.row + 1)
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// An inclusive rectangle of cells, always normalized so `from <= to` on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    from: CellAddress,
    to: CellAddress,
}

impl CellRange {
    /// Create a range from two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            from: CellAddress::new(a.col.min(b.col), a.row.min(b.row)),
            to: CellAddress::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// Create a range from `(x1, y1)` and `(x2, y2)` column/row bounds in any order
    pub fn from_bounds(x1: u16, y1: u32, x2: u16, y2: u32) -> Self {
        Self::new(CellAddress::new(x1, y1), CellAddress::new(x2, y2))
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            from: addr,
            to: addr,
        }
    }

    /// Top-left corner
    pub fn from(&self) -> CellAddress {
        self.from
    }

    /// Bottom-right corner
    pub fn to(&self) -> CellAddress {
        self.to
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.split_once(':') {
            Some((start, end)) => {
                let start = CellAddress::parse(start)
                    .map_err(|_| Error::InvalidRange(s.to_string()))?;
                let end =
                    CellAddress::parse(end).map_err(|_| Error::InvalidRange(s.to_string()))?;
                Ok(Self::new(start, end))
            }
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row >= self.from.row
            && addr.row <= self.to.row
            && addr.col >= self.from.col
            && addr.col <= self.to.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.to.row - self.from.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u32 {
        (self.to.col - self.from.col) as u32 + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Two rectangles overlap iff their projections overlap on both axes.
    ///
    /// Ranges that only share an edge line do not overlap; ranges sharing
    /// a row or column of cells do.
    pub fn overlaps(&self, other: &CellRange) -> bool {
        let rows = self.from.row <= other.to.row && other.from.row <= self.to.row;
        let cols = self.from.col <= other.to.col && other.from.col <= self.to.col;
        rows && cols
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> {
        let (from, to) = (self.from, self.to);
        (from.row..=to.row)
            .flat_map(move |row| (from.col..=to.col).map(move |col| CellAddress::new(col, row)))
    }

    /// Format as A1:B10 string (single cells collapse to A1)
    pub fn to_a1_string(&self) -> String {
        if self.from == self.to {
            self.from.to_a1_string()
        } else {
            format!("{}:{}", self.from.to_a1_string(), self.to.to_a1_string())
        }
    }

    /// Format as `$A$1:$B$2`, always with both corners
    pub fn to_absolute_string(&self) -> String {
        format!(
            "{}:{}",
            self.from.to_absolute_string(),
            self.to.to_absolute_string()
        )
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Quote a sheet name for use in a reference (`'My Sheet'`), doubling embedded quotes
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Sheet-qualified absolute reference: `'Sheet'!$A$1:$B$2`
pub fn sheet_reference(sheet: &str, range: &CellRange) -> String {
    format!("{}!{}", quote_sheet_name(sheet), range.to_absolute_string())
}

/// Split `'Sheet'!$A$1:$B$2` (or `Sheet!A1`) into its sheet name and range
pub fn parse_sheet_reference(s: &str) -> Result<(String, CellRange)> {
    let s = s.trim().trim_start_matches('=');
    let (sheet, range) = s
        .rsplit_once('!')
        .ok_or_else(|| Error::InvalidRange(s.to_string()))?;

    let sheet = match sheet.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_string(),
    };

    if sheet.is_empty() {
        return Err(Error::InvalidRange(s.to_string()));
    }

    Ok((sheet, CellRange::parse(range)?))
}
