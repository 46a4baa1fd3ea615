//! Worksheet implementation

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::autofit::DEFAULT_CALIBRATION_FACTOR;
use crate::cell::{column_letters, Cell, CellAddress, CellRange, CellValue};
use crate::chart::Chart;
use crate::error::{Error, Result};
use crate::style::{number_format, Style};
use crate::validation::DataValidation;
use crate::{MAX_COLS, MAX_COLUMN_WIDTH, MAX_ROWS};

/// What happens to a cell's existing style when its value is replaced
#[derive(Debug, Clone, PartialEq)]
pub enum StyleMerge {
    /// Keep whatever style the cell already has
    Preserve,
    /// Drop the prior style; install the given one, or the default when `None`
    Replace(Option<Style>),
}

/// How columns without an explicit width are sized on save
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnSizing {
    /// Estimate widths from cell contents, scaled by `calibration_factor`
    Auto { calibration_factor: f64 },
    /// Leave unset columns at the format's default width
    Fixed,
}

impl Default for ColumnSizing {
    fn default() -> Self {
        ColumnSizing::Auto {
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
        }
    }
}

/// Frozen split: columns left of `col` and rows above `row` stay visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezePane {
    /// Number of frozen columns
    pub col: u16,
    /// Number of frozen rows
    pub row: u32,
}

/// A single worksheet
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellAddress, Cell>,
    column_widths: BTreeMap<u16, f64>,
    row_heights: BTreeMap<u32, f64>,
    merges: Vec<CellRange>,
    validations: Vec<(CellRange, DataValidation)>,
    charts: Vec<Chart>,
    freeze_pane: Option<FreezePane>,
    column_sizing: ColumnSizing,
}

impl Worksheet {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            cells: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            merges: Vec::new(),
            validations: Vec::new(),
            charts: Vec::new(),
            freeze_pane: None,
            column_sizing: ColumnSizing::default(),
        }
    }

    /// Get the worksheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    // === Cells ===

    /// Insert or replace a cell value.
    ///
    /// The last write to an address wins. `merge` decides what happens to
    /// the style the cell had before.
    pub fn add_cell(
        &mut self,
        addr: CellAddress,
        value: impl Into<CellValue>,
        merge: StyleMerge,
    ) -> Result<()> {
        validate_position(addr)?;

        let value = value.into().normalized();
        let style = match merge {
            StyleMerge::Preserve => self.cells.get(&addr).and_then(|c| c.style.clone()),
            StyleMerge::Replace(style) => style.map(Arc::new),
        };

        let style = with_date_format(&value, style);
        self.cells.insert(addr, Cell { value, style });
        Ok(())
    }

    /// Set a cell value, keeping its current style
    pub fn set_value(&mut self, addr: CellAddress, value: impl Into<CellValue>) -> Result<()> {
        self.add_cell(addr, value, StyleMerge::Preserve)
    }

    /// Upsert consecutive cells of one row starting at `first_col`
    pub fn add_row<I, V>(
        &mut self,
        row: u32,
        first_col: u16,
        values: I,
        merge: StyleMerge,
    ) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        for (offset, value) in values.into_iter().enumerate() {
            let col = u16::try_from(first_col as usize + offset)
                .map_err(|_| Error::ColumnOutOfBounds(first_col as u32 + offset as u32, MAX_COLS - 1))?;
            self.add_cell(CellAddress::new(col, row), value, merge.clone())?;
        }
        Ok(())
    }

    /// Replace a cell's style, creating an empty cell if needed
    pub fn set_style(&mut self, addr: CellAddress, style: Style) -> Result<()> {
        self.update_style(addr, |_| style)
    }

    /// Copy-with: derive a new style from the cell's current one
    /// (or the built-in default) and install it
    pub fn update_style<F>(&mut self, addr: CellAddress, f: F) -> Result<()>
    where
        F: FnOnce(Style) -> Style,
    {
        validate_position(addr)?;

        let cell = self.cells.entry(addr).or_default();
        let current = cell
            .style
            .as_deref()
            .cloned()
            .unwrap_or_default();
        let style = Some(Arc::new(f(current)));
        cell.style = with_date_format(&cell.value, style);
        Ok(())
    }

    /// Insert a fully built cell as-is
    pub fn insert_cell(&mut self, addr: CellAddress, cell: Cell) -> Result<()> {
        validate_position(addr)?;
        self.cells.insert(addr, cell);
        Ok(())
    }

    /// Get a cell
    pub fn cell(&self, addr: CellAddress) -> Option<&Cell> {
        self.cells.get(&addr)
    }

    /// Get a cell value
    pub fn value(&self, addr: CellAddress) -> Option<&CellValue> {
        self.cells.get(&addr).map(|c| &c.value)
    }

    /// Remove a cell
    pub fn remove_cell(&mut self, addr: CellAddress) -> Option<Cell> {
        self.cells.remove(&addr)
    }

    /// Iterate over populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> {
        self.cells.iter().map(|(a, c)| (*a, c))
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Smallest rectangle containing every populated cell
    pub fn used_range(&self) -> Option<CellRange> {
        let first = self.cells.keys().next()?;
        let last_row = self.cells.keys().next_back()?.row;
        let (min_col, max_col) = self
            .cells
            .keys()
            .fold((u16::MAX, 0u16), |(lo, hi), a| (lo.min(a.col), hi.max(a.col)));
        Some(CellRange::from_bounds(min_col, first.row, max_col, last_row))
    }

    // === Rows and columns ===

    /// Set an explicit column width (clamped to 0..=255 characters)
    pub fn set_column_width(&mut self, col: u16, width: f64) -> Result<()> {
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
        }
        if !width.is_finite() {
            return Err(Error::NonFiniteNumber(format!(
                "width of column {}",
                column_letters(col as u32 + 1)
            )));
        }
        self.column_widths
            .insert(col, width.clamp(0.0, MAX_COLUMN_WIDTH));
        Ok(())
    }

    /// Explicit width of a column, if set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// All explicit column widths, by column
    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    /// Set an explicit row height in points
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if !height.is_finite() {
            return Err(Error::NonFiniteNumber(format!("height of row {}", row + 1)));
        }
        self.row_heights.insert(row, height.max(0.0));
        Ok(())
    }

    /// Explicit height of a row, if set
    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    /// All explicit row heights, by row
    pub fn row_heights(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.row_heights.iter().map(|(r, h)| (*r, *h))
    }

    /// How unset column widths are resolved on save
    pub fn column_sizing(&self) -> ColumnSizing {
        self.column_sizing
    }

    pub fn set_column_sizing(&mut self, sizing: ColumnSizing) {
        self.column_sizing = sizing;
    }

    // === Merges ===

    /// Merge a range of cells.
    ///
    /// Fails if the range overlaps an existing merge. Ranges that only touch
    /// along an edge are fine.
    pub fn merge_cells(&mut self, range: CellRange) -> Result<()> {
        validate_position(range.to())?;
        if let Some(existing) = self.merges.iter().find(|m| m.overlaps(&range)) {
            return Err(Error::MergeOverlap {
                new: range.to_a1_string(),
                existing: existing.to_a1_string(),
            });
        }
        self.merges.push(range);
        Ok(())
    }

    /// Merged ranges, in insertion order
    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    // === Validations ===

    /// Attach a validation to a range, replacing any on the identical range
    pub fn add_validation(&mut self, range: CellRange, validation: DataValidation) {
        match self.validations.iter_mut().find(|(r, _)| *r == range) {
            Some(slot) => slot.1 = validation,
            None => self.validations.push((range, validation)),
        }
    }

    /// Validations with their target ranges
    pub fn validations(&self) -> &[(CellRange, DataValidation)] {
        &self.validations
    }

    // === Charts ===

    /// Add a chart; later charts sit above earlier ones
    pub fn add_chart(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    /// Charts in placement order
    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub(crate) fn charts_mut(&mut self) -> &mut [Chart] {
        &mut self.charts
    }

    // === Freeze panes ===

    /// Freeze the first `col` columns and `row` rows; `(0, 0)` unfreezes
    pub fn freeze_panes(&mut self, col: u16, row: u32) -> Result<()> {
        validate_position(CellAddress::new(col, row))?;
        self.freeze_pane = if col == 0 && row == 0 {
            None
        } else {
            Some(FreezePane { col, row })
        };
        Ok(())
    }

    /// Current frozen split
    pub fn freeze_pane(&self) -> Option<FreezePane> {
        self.freeze_pane
    }
}

fn validate_position(addr: CellAddress) -> Result<()> {
    if addr.row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(addr.row, MAX_ROWS - 1));
    }
    if addr.col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(addr.col as u32, MAX_COLS - 1));
    }
    Ok(())
}

/// Date cells need a date number format so the reader can tell them from numbers
fn with_date_format(value: &CellValue, style: Option<Arc<Style>>) -> Option<Arc<Style>> {
    if !matches!(value, CellValue::DateTime(_)) {
        return style;
    }
    match style {
        Some(s) if s.is_date_format() => Some(s),
        Some(s) if s.number_format != number_format::GENERAL => Some(s),
        other => {
            let base = other.as_deref().cloned().unwrap_or_default();
            Some(Arc::new(base.number_format(number_format::DEFAULT_DATETIME)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;
    use chrono::NaiveDate;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn sheet() -> Worksheet {
        Worksheet::new("Test".into())
    }

    #[test]
    fn test_last_write_wins() {
        let mut ws = sheet();
        ws.set_value(addr("A1"), "first").unwrap();
        ws.set_value(addr("A1"), 2).unwrap();
        assert_eq!(ws.value(addr("A1")), Some(&CellValue::Integer(2)));
        assert_eq!(ws.cell_count(), 1);
    }

    #[test]
    fn test_preserve_keeps_style() {
        let mut ws = sheet();
        let bold = Style::new().bold(true);
        ws.add_cell(addr("B2"), "x", StyleMerge::Replace(Some(bold.clone())))
            .unwrap();
        ws.add_cell(addr("B2"), "y", StyleMerge::Preserve).unwrap();

        let cell = ws.cell(addr("B2")).unwrap();
        assert_eq!(cell.value, CellValue::text("y"));
        assert_eq!(cell.style.as_deref(), Some(&bold));
    }

    #[test]
    fn test_replace_drops_style() {
        let mut ws = sheet();
        ws.set_style(addr("C3"), Style::new().fill_color(Color::RED))
            .unwrap();
        ws.add_cell(addr("C3"), 1.5, StyleMerge::Replace(None)).unwrap();
        assert!(ws.cell(addr("C3")).unwrap().style.is_none());
    }

    #[test]
    fn test_update_style_copies() {
        let mut ws = sheet();
        ws.add_cell(
            addr("A1"),
            "x",
            StyleMerge::Replace(Some(Style::new().font_size(14.0))),
        )
        .unwrap();
        ws.update_style(addr("A1"), |s| s.italic(true)).unwrap();

        let style = ws.cell(addr("A1")).unwrap().style.clone().unwrap();
        assert!(style.font.italic);
        assert_eq!(style.font.size, 14.0);
    }

    #[test]
    fn test_add_row() {
        let mut ws = sheet();
        ws.add_row(
            4,
            1,
            vec![CellValue::text("a"), 2.into(), true.into()],
            StyleMerge::Preserve,
        )
        .unwrap();
        assert_eq!(ws.value(addr("B5")), Some(&CellValue::text("a")));
        assert_eq!(ws.value(addr("D5")), Some(&CellValue::Boolean(true)));
        assert!(ws.add_row(0, MAX_COLS - 1, vec![1, 2], StyleMerge::Preserve).is_err());
    }

    #[test]
    fn test_formula_is_normalized() {
        let mut ws = sheet();
        ws.set_value(addr("A1"), CellValue::Formula("SUM(B1:B3)".into()))
            .unwrap();
        assert_eq!(
            ws.value(addr("A1")).and_then(|v| v.formula_text()),
            Some("=SUM(B1:B3)")
        );
    }

    #[test]
    fn test_datetime_gets_date_format() {
        let mut ws = sheet();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        ws.set_value(addr("A1"), date).unwrap();
        let style = ws.cell(addr("A1")).unwrap().style.clone().unwrap();
        assert_eq!(style.number_format, number_format::DEFAULT_DATETIME);

        ws.add_cell(
            addr("A2"),
            date,
            StyleMerge::Replace(Some(Style::new().number_format("dd/mm/yyyy"))),
        )
        .unwrap();
        let style = ws.cell(addr("A2")).unwrap().style.clone().unwrap();
        assert_eq!(style.number_format, "dd/mm/yyyy");
    }

    #[test]
    fn test_merges_touching_edges_succeed() {
        let mut ws = sheet();
        ws.merge_cells(CellRange::parse("A1:B2").unwrap()).unwrap();
        ws.merge_cells(CellRange::parse("C1:D2").unwrap()).unwrap();
        ws.merge_cells(CellRange::parse("A3:D3").unwrap()).unwrap();
        assert_eq!(ws.merges().len(), 3);
    }

    #[test]
    fn test_merges_overlapping_fail() {
        let mut ws = sheet();
        ws.merge_cells(CellRange::parse("A1:B2").unwrap()).unwrap();
        let err = ws
            .merge_cells(CellRange::parse("B2:C3").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::MergeOverlap { .. }));
        assert_eq!(ws.merges().len(), 1);
    }

    #[test]
    fn test_validation_replaces_same_range() {
        let mut ws = sheet();
        let range = CellRange::parse("A1:A5").unwrap();
        ws.add_validation(range, DataValidation::list(["a"]));
        ws.add_validation(range, DataValidation::list(["b"]));
        assert_eq!(ws.validations().len(), 1);
        assert_eq!(ws.validations()[0].1, DataValidation::list(["b"]));
    }

    #[test]
    fn test_freeze_panes() {
        let mut ws = sheet();
        ws.freeze_panes(1, 2).unwrap();
        assert_eq!(ws.freeze_pane(), Some(FreezePane { col: 1, row: 2 }));
        ws.freeze_panes(0, 0).unwrap();
        assert_eq!(ws.freeze_pane(), None);
    }

    #[test]
    fn test_column_width_clamped() {
        let mut ws = sheet();
        ws.set_column_width(0, 300.0).unwrap();
        ws.set_column_width(1, -4.0).unwrap();
        assert_eq!(ws.column_width(0), Some(MAX_COLUMN_WIDTH));
        assert_eq!(ws.column_width(1), Some(0.0));
        assert!(ws.set_column_width(MAX_COLS, 10.0).is_err());
    }

    #[test]
    fn test_non_finite_sizes_rejected() {
        let mut ws = sheet();
        ws.set_column_width(1, 12.0).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = ws.set_column_width(1, bad).unwrap_err();
            assert!(matches!(&err, Error::NonFiniteNumber(what) if what == "width of column B"));
            let err = ws.set_row_height(2, bad).unwrap_err();
            assert!(matches!(&err, Error::NonFiniteNumber(what) if what == "height of row 3"));
        }
        assert_eq!(ws.column_width(1), Some(12.0));
        assert_eq!(ws.row_height(2), None);
    }

    #[test]
    fn test_used_range() {
        let mut ws = sheet();
        assert_eq!(ws.used_range(), None);
        ws.set_value(addr("C2"), 1).unwrap();
        ws.set_value(addr("A5"), 1).unwrap();
        assert_eq!(ws.used_range().unwrap().to_a1_string(), "A2:C5");
    }

    #[test]
    fn test_out_of_bounds_cell() {
        let mut ws = sheet();
        assert!(ws.set_value(CellAddress::new(MAX_COLS, 0), 1).is_err());
        assert!(ws.set_value(CellAddress::new(0, MAX_ROWS), 1).is_err());
    }
}
