//! Workbook type - the main document structure

use crate::cell::{CellRange, CellValue};
use crate::error::{Error, Result};
use crate::named_range::NamedRange;
use crate::style::Style;
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Characters a sheet name may not contain
const INVALID_SHEET_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// A workbook (spreadsheet document)
///
/// Holds worksheets in tab order, workbook-level named ranges, and the
/// default style cells fall back to.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Document title
    name: String,
    /// Worksheets in tab order
    worksheets: Vec<Worksheet>,
    /// Named ranges (defined names)
    named_ranges: Vec<NamedRange>,
    /// Style for cells without one of their own
    default_style: Style,
}

impl Workbook {
    /// Create an empty workbook with no worksheets
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            worksheets: Vec::new(),
            named_ranges: Vec::new(),
            default_style: Style::default(),
        }
    }

    /// Document title
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Style used by cells without an explicit one
    pub fn default_style(&self) -> &Style {
        &self.default_style
    }

    pub fn set_default_style(&mut self, style: Style) {
        self.default_style = style;
    }

    // === Worksheets ===

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.worksheets[i])
    }

    /// Get a mutable worksheet by name (case-insensitive)
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        let index = self.sheet_index(name)?;
        self.worksheets.get_mut(index)
    }

    /// Get the index of a worksheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| names_match(ws.name(), name))
    }

    /// Iterate over worksheets in tab order
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over worksheets mutably
    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Append a worksheet and return it for population
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.validate_sheet_name(name, None)?;

        let index = self.worksheets.len();
        self.worksheets.push(Worksheet::new(name.to_string()));
        Ok(&mut self.worksheets[index])
    }

    /// Rename a worksheet, updating named ranges and chart sources that
    /// pointed at the old name
    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(new_name, Some(index))?;

        let old_name = self.worksheets[index].name().to_string();
        self.worksheets[index].set_name(new_name.to_string());

        for nr in &mut self.named_ranges {
            if names_match(nr.sheet_name(), &old_name) {
                nr.set_sheet_name(new_name.to_string());
            }
        }
        for ws in &mut self.worksheets {
            for chart in ws.charts_mut() {
                let points_at_old = chart
                    .data_sheet
                    .as_deref()
                    .map_or(false, |s| names_match(s, &old_name));
                if points_at_old {
                    chart.data_sheet = Some(new_name.to_string());
                }
            }
        }

        Ok(())
    }

    /// Remove a worksheet by index.
    ///
    /// Named ranges on the removed sheet are kept and reported by
    /// [`Workbook::validate`].
    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        Ok(self.worksheets.remove(index))
    }

    // === Named ranges ===

    /// Add a workbook-level named range.
    ///
    /// The name must be unique (case-insensitive) and the sheet must exist.
    pub fn add_named_range(
        &mut self,
        name: &str,
        sheet_name: &str,
        range: CellRange,
    ) -> Result<()> {
        let named = NamedRange::new(name, sheet_name, range)?;
        if self.named_range(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }
        if self.sheet_index(sheet_name).is_none() {
            return Err(Error::DanglingNamedRange {
                name: name.to_string(),
                sheet: sheet_name.to_string(),
            });
        }
        self.named_ranges.push(named);
        Ok(())
    }

    /// Named ranges in definition order
    pub fn named_ranges(&self) -> &[NamedRange] {
        &self.named_ranges
    }

    /// Look up a named range (case-insensitive)
    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.named_ranges
            .iter()
            .find(|nr| names_match(nr.name(), name))
    }

    /// Remove a named range
    pub fn remove_named_range(&mut self, name: &str) -> Option<NamedRange> {
        let pos = self
            .named_ranges
            .iter()
            .position(|nr| names_match(nr.name(), name))?;
        Some(self.named_ranges.remove(pos))
    }

    // === Validation ===

    /// Check every structural invariant a saved file depends on.
    ///
    /// Mutators already enforce most of these; this catches state that can
    /// only arise after the fact (removed sheets, non-finite numbers).
    pub fn validate(&self) -> Result<()> {
        if self.worksheets.is_empty() {
            return Err(Error::NoWorksheets);
        }

        for (i, ws) in self.worksheets.iter().enumerate() {
            self.validate_sheet_name(ws.name(), Some(i))?;

            for (j, merge) in ws.merges().iter().enumerate() {
                if let Some(other) = ws.merges()[j + 1..].iter().find(|m| m.overlaps(merge)) {
                    return Err(Error::MergeOverlap {
                        new: other.to_a1_string(),
                        existing: merge.to_a1_string(),
                    });
                }
            }

            for (addr, cell) in ws.cells() {
                if let CellValue::Number(n) = cell.value {
                    if !n.is_finite() {
                        return Err(Error::NonFiniteNumber(format!(
                            "'{}'!{}",
                            ws.name(),
                            addr
                        )));
                    }
                }
            }

            for chart in ws.charts() {
                let source = chart.data_sheet_or(ws.name());
                if self.sheet_index(source).is_none() {
                    return Err(Error::UnknownChartSource {
                        sheet: ws.name().to_string(),
                        source_sheet: source.to_string(),
                    });
                }
            }
        }

        for (i, nr) in self.named_ranges.iter().enumerate() {
            let duplicate = self.named_ranges[..i]
                .iter()
                .any(|other| names_match(other.name(), nr.name()));
            if duplicate {
                return Err(Error::DuplicateName(nr.name().to_string()));
            }
            if self.sheet_index(nr.sheet_name()).is_none() {
                return Err(Error::DanglingNamedRange {
                    name: nr.name().to_string(),
                    sheet: nr.sheet_name().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validate a sheet name, ignoring the sheet at `exclude_index` when
    /// checking for duplicates
    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::EmptyName("sheet"));
        }

        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        for c in INVALID_SHEET_CHARS {
            if name.contains(c) {
                return Err(Error::InvalidSheetName(format!(
                    "Name contains invalid character: {}",
                    c
                )));
            }
        }

        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Name cannot start or end with an apostrophe".into(),
            ));
        }

        let duplicate = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && names_match(ws.name(), name));
        if duplicate {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }

        Ok(())
    }
}

/// Case-insensitive name comparison, folding non-ASCII letters too
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new("Workbook")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellAddress;
    use crate::chart::{Chart, Series};

    fn range(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Data").unwrap();
        wb.add_worksheet("Summary").unwrap();

        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(wb.worksheet(1).unwrap().name(), "Summary");
        assert_eq!(wb.sheet_index("SUMMARY"), Some(1));
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Data").unwrap();
        assert!(matches!(
            wb.add_worksheet("data"),
            Err(Error::DuplicateSheetName(_))
        ));
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new("Report");
        assert!(matches!(wb.add_worksheet("   "), Err(Error::EmptyName("sheet"))));
        assert!(wb.add_worksheet("a/b").is_err());
        assert!(wb.add_worksheet("[x]").is_err());
        assert!(wb.add_worksheet("'quoted'").is_err());
        assert!(wb.add_worksheet(&"x".repeat(32)).is_err());
        assert!(wb.add_worksheet(&"x".repeat(31)).is_ok());
    }

    #[test]
    fn test_named_range_duplicates() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Sales").unwrap();
        wb.add_worksheet("Costs").unwrap();

        wb.add_named_range("Revenue", "Sales", range("B2:B10")).unwrap();
        wb.add_named_range("Spend", "Costs", range("C2:C10")).unwrap();
        assert!(matches!(
            wb.add_named_range("REVENUE", "Costs", range("A1")),
            Err(Error::DuplicateName(_))
        ));

        let formulas: Vec<String> = wb.named_ranges().iter().map(|n| n.formula()).collect();
        assert_eq!(formulas, vec!["'Sales'!$B$2:$B$10", "'Costs'!$C$2:$C$10"]);
    }

    #[test]
    fn test_named_range_unknown_sheet() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Sales").unwrap();
        assert!(matches!(
            wb.add_named_range("Rate", "Missing", range("A1")),
            Err(Error::DanglingNamedRange { .. })
        ));
    }

    #[test]
    fn test_rename_updates_references() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Data").unwrap();
        let dash = wb.add_worksheet("Dash").unwrap();
        dash.add_chart(
            Chart::bar()
                .with_data_sheet("Data")
                .with_series(Series::new(range("A2:A5"), range("B2:B5"))),
        );
        wb.add_named_range("Values", "Data", range("B2:B5")).unwrap();

        wb.rename_worksheet(0, "Source").unwrap();

        assert_eq!(wb.named_range("values").unwrap().sheet_name(), "Source");
        assert_eq!(
            wb.worksheet(1).unwrap().charts()[0].data_sheet.as_deref(),
            Some("Source")
        );
        wb.validate().unwrap();
    }

    #[test]
    fn test_non_ascii_names_fold_case() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Ärger").unwrap();
        assert!(matches!(
            wb.add_worksheet("ärger"),
            Err(Error::DuplicateSheetName(_))
        ));
        assert_eq!(wb.sheet_index("ÄRGER"), Some(0));

        wb.add_named_range("Größe", "ärger", range("A1:A4")).unwrap();
        assert!(matches!(
            wb.add_named_range("GRÖßE", "Ärger", range("B1")),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(wb.named_range("größe").unwrap().sheet_name(), "ärger");
        wb.validate().unwrap();

        wb.add_worksheet("Übersicht").unwrap();
        assert!(matches!(
            wb.rename_worksheet(1, "ärger"),
            Err(Error::DuplicateSheetName(_))
        ));
        assert!(wb.remove_named_range("GRÖßE").is_some());
    }

    #[test]
    fn test_rename_to_same_name_different_case() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("data").unwrap();
        wb.rename_worksheet(0, "Data").unwrap();
        assert_eq!(wb.worksheet(0).unwrap().name(), "Data");
    }

    #[test]
    fn test_validate_after_remove() {
        let mut wb = Workbook::new("Report");
        wb.add_worksheet("Keep").unwrap();
        wb.add_worksheet("Drop").unwrap();
        wb.add_named_range("Gone", "Drop", range("A1")).unwrap();
        wb.remove_worksheet(1).unwrap();

        assert!(matches!(
            wb.validate(),
            Err(Error::DanglingNamedRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_and_empty() {
        assert!(matches!(
            Workbook::new("Empty").validate(),
            Err(Error::NoWorksheets)
        ));

        let mut wb = Workbook::new("Report");
        let ws = wb.add_worksheet("Data").unwrap();
        ws.set_value(CellAddress::new(0, 0), f64::NAN).unwrap();
        assert!(matches!(wb.validate(), Err(Error::NonFiniteNumber(_))));
    }

    #[test]
    fn test_validate_chart_source() {
        let mut wb = Workbook::new("Report");
        let ws = wb.add_worksheet("Dash").unwrap();
        ws.add_chart(Chart::pie().with_data_sheet("Nowhere"));
        assert!(matches!(
            wb.validate(),
            Err(Error::UnknownChartSource { .. })
        ));
    }
}
