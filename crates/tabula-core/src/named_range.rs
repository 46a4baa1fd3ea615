//! Named range definitions
//!
//! A named range binds a workbook-level name to a rectangle on one sheet.
//! It is written as a defined name whose formula is the sheet-qualified
//! absolute reference, e.g. `'Sales'!$A$2:$D$20`.

use crate::cell::{sheet_reference, CellRange};
use crate::error::{Error, Result};

/// A named range definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    name: String,
    sheet_name: String,
    range: CellRange,
}

impl NamedRange {
    /// Create a named range, checking the name's syntax
    pub fn new(
        name: impl Into<String>,
        sheet_name: impl Into<String>,
        range: CellRange,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;

        let sheet_name = sheet_name.into();
        if sheet_name.trim().is_empty() {
            return Err(Error::EmptyName("sheet"));
        }

        Ok(Self {
            name,
            sheet_name,
            range,
        })
    }

    /// The name (case-insensitive for uniqueness)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sheet the range lives on
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Referenced rectangle
    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Formula form: `'Sheet'!$A$1:$B$2`
    pub fn formula(&self) -> String {
        sheet_reference(&self.sheet_name, &self.range)
    }

    /// Point this name at a different sheet (used when a sheet is renamed)
    pub(crate) fn set_sheet_name(&mut self, sheet_name: String) {
        self.sheet_name = sheet_name;
    }
}

/// Check defined-name syntax: starts with a letter, `_` or `\`, continues
/// with letters, digits, `_` or `.`, and does not look like a cell reference.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::EmptyName("named range"));
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '\\');
    let rest_ok = chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.');

    if !first_ok || !rest_ok {
        return Err(Error::InvalidName(name.to_string()));
    }

    let looks_like_reference = crate::cell::CellAddress::parse(name).is_ok()
        || name.eq_ignore_ascii_case("r")
        || name.eq_ignore_ascii_case("c");
    if looks_like_reference {
        return Err(Error::InvalidName(name.to_string()));
    }

    Ok(())
}
