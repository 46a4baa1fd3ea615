//! End-to-end tests for XLSX roundtrip (build -> write -> read -> verify)

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Cursor;
use tabula::prelude::*;
use tabula::{
    BarDirection, ChartKind, Criterion, FreezePane, ListSource, ValidationErrorStyle, ValidationRule,
};

fn addr(a1: &str) -> CellAddress {
    CellAddress::parse(a1).unwrap()
}

fn range(a1: &str) -> CellRange {
    CellRange::parse(a1).unwrap()
}

fn roundtrip(wb: &Workbook) -> Workbook {
    let bytes = XlsxWriter::new().to_bytes(wb).unwrap();
    XlsxReader::read(Cursor::new(bytes)).unwrap()
}

/// Every value kind survives a save and load
#[test]
fn test_roundtrip_value_kinds() {
    let when = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();

    let mut wb = Workbook::new("Values");
    let sheet = wb.add_worksheet("Data").unwrap();
    sheet.set_value(addr("A1"), "Hello, <World> & \"friends\"").unwrap();
    sheet.set_value(addr("A2"), 42).unwrap();
    sheet.set_value(addr("A3"), -7_000_000_000i64).unwrap();
    sheet.set_value(addr("A4"), 3.14159).unwrap();
    sheet.set_value(addr("A5"), true).unwrap();
    sheet.set_value(addr("A6"), false).unwrap();
    sheet.set_value(addr("A7"), when).unwrap();
    sheet.set_value(addr("A8"), CellValue::formula("SUM(A2:A4)")).unwrap();
    sheet.set_value(addr("A9"), "  padded  ").unwrap();
    sheet.set_value(addr("A10"), "line one\nline two").unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();

    assert_eq!(sheet2.name(), "Data");
    assert_eq!(
        sheet2.value(addr("A1")),
        Some(&CellValue::text("Hello, <World> & \"friends\""))
    );
    assert_eq!(sheet2.value(addr("A2")), Some(&CellValue::Integer(42)));
    assert_eq!(sheet2.value(addr("A3")), Some(&CellValue::Integer(-7_000_000_000)));
    assert_eq!(sheet2.value(addr("A4")), Some(&CellValue::Number(3.14159)));
    assert_eq!(sheet2.value(addr("A5")), Some(&CellValue::Boolean(true)));
    assert_eq!(sheet2.value(addr("A6")), Some(&CellValue::Boolean(false)));
    assert_eq!(sheet2.value(addr("A7")), Some(&CellValue::DateTime(when)));
    assert_eq!(
        sheet2.value(addr("A8")),
        Some(&CellValue::Formula("=SUM(A2:A4)".into()))
    );
    assert_eq!(sheet2.value(addr("A9")), Some(&CellValue::text("  padded  ")));
    assert_eq!(
        sheet2.value(addr("A10")),
        Some(&CellValue::text("line one\nline two"))
    );
    assert_eq!(sheet2.cell_count(), 10);
}

/// Last write to an address wins and the prior style follows the merge mode
#[test]
fn test_roundtrip_upserts() {
    let bold = Style::new().bold(true);

    let mut wb = Workbook::new("Upserts");
    let sheet = wb.add_worksheet("Sheet1").unwrap();
    sheet
        .add_cell(addr("B2"), "first", StyleMerge::Replace(Some(bold.clone())))
        .unwrap();
    sheet.add_cell(addr("B2"), "second", StyleMerge::Preserve).unwrap();
    sheet
        .add_cell(addr("C2"), "first", StyleMerge::Replace(Some(bold)))
        .unwrap();
    sheet.add_cell(addr("C2"), 9, StyleMerge::Replace(None)).unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();

    let b2 = sheet2.cell(addr("B2")).unwrap();
    assert_eq!(b2.value, CellValue::text("second"));
    assert!(b2.style.as_ref().is_some_and(|s| s.font.bold));

    let c2 = sheet2.cell(addr("C2")).unwrap();
    assert_eq!(c2.value, CellValue::Integer(9));
    assert!(c2.style.is_none());
}

/// Sheets keep their order, names and sparse far-away cells
#[test]
fn test_roundtrip_multiple_sheets() {
    let mut wb = Workbook::new("Many");
    wb.add_worksheet("First")
        .unwrap()
        .set_value(addr("A1"), "one")
        .unwrap();
    wb.add_worksheet("Q1 & Q2 'Report' data")
        .unwrap()
        .set_value(addr("XFD1048576"), "corner")
        .unwrap();
    wb.add_worksheet("Third")
        .unwrap()
        .set_value(addr("Z100"), 1.5)
        .unwrap();

    let wb2 = roundtrip(&wb);

    assert_eq!(wb2.sheet_count(), 3);
    let names: Vec<&str> = wb2.worksheets().map(|ws| ws.name()).collect();
    assert_eq!(names, vec!["First", "Q1 & Q2 'Report' data", "Third"]);
    assert_eq!(
        wb2.worksheet(1).unwrap().value(addr("XFD1048576")),
        Some(&CellValue::text("corner"))
    );
    assert_eq!(
        wb2.worksheet(2).unwrap().value(addr("Z100")),
        Some(&CellValue::Number(1.5))
    );
    assert_eq!(wb2.name(), "Many");
}

/// Saving an unchanged workbook twice produces identical bytes
#[test]
fn test_output_is_deterministic() {
    let mut wb = Workbook::new("Stable");
    let sheet = wb.add_worksheet("Data").unwrap();
    sheet.add_row(0, 0, ["Month", "Sales"], StyleMerge::Replace(Some(Style::new().bold(true))))
        .unwrap();
    for (i, month) in ["Jan", "Feb", "Mar"].into_iter().enumerate() {
        sheet
            .add_row(
                i as u32 + 1,
                0,
                [CellValue::from(month), CellValue::from(100 * (i as i64 + 1))],
                StyleMerge::Preserve,
            )
            .unwrap();
    }
    sheet.add_chart(
        Chart::bar()
            .with_title("Sales")
            .with_series(Series::new(range("A2:A4"), range("B2:B4")).with_name("Sales")),
    );
    wb.add_named_range("Sales", "Data", range("B2:B4")).unwrap();

    let writer = XlsxWriter::new();
    let first = writer.to_bytes(&wb).unwrap();
    let second = writer.to_bytes(&wb).unwrap();
    assert_eq!(first, second);
}

/// Named ranges come back with their sheet and bounds
#[test]
fn test_roundtrip_named_ranges() {
    let mut wb = Workbook::new("Names");
    wb.add_worksheet("Data").unwrap();
    wb.add_worksheet("My Sheet").unwrap();
    wb.add_named_range("Totals", "Data", range("B1:B3")).unwrap();
    wb.add_named_range("Corner", "My Sheet", range("A1")).unwrap();

    let dup = wb.add_named_range("TOTALS", "Data", range("C1"));
    assert!(matches!(dup, Err(Error::DuplicateName(_))));

    let wb2 = roundtrip(&wb);

    assert_eq!(wb2.named_ranges().len(), 2);
    let totals = wb2.named_range("Totals").unwrap();
    assert_eq!(totals.sheet_name(), "Data");
    assert_eq!(totals.range(), range("B1:B3"));
    let corner = wb2.named_range("corner").unwrap();
    assert_eq!(corner.sheet_name(), "My Sheet");
    assert_eq!(corner.range(), range("A1"));
}

/// Merges that only share an edge are both kept
#[test]
fn test_roundtrip_merges() {
    let mut wb = Workbook::new("Merges");
    let sheet = wb.add_worksheet("Sheet1").unwrap();
    sheet.set_value(addr("A1"), "Header").unwrap();
    sheet.merge_cells(range("A1:C1")).unwrap();
    sheet.merge_cells(range("D1:D4")).unwrap();
    sheet.merge_cells(range("A2:C4")).unwrap();

    let overlap = sheet.merge_cells(range("C3:E5"));
    assert!(matches!(overlap, Err(Error::MergeOverlap { .. })));

    let wb2 = roundtrip(&wb);
    assert_eq!(
        wb2.worksheet(0).unwrap().merges(),
        &[range("A1:C1"), range("D1:D4"), range("A2:C4")]
    );
}

/// Each validation family keeps its rule, messages and alert style
#[test]
fn test_roundtrip_validations() {
    let mut wb = Workbook::new("Checks");
    let sheet = wb.add_worksheet("Form").unwrap();

    let list = DataValidation::list(["Yes", "No", "Say \"maybe\""])
        .with_input_message("Pick one", "Choose from the list");
    let whole = DataValidation::whole_number(ValidationOperator::Between, 1, Some(10))
        .unwrap()
        .with_error_alert("Out of range", "Enter 1 to 10")
        .with_error_style(ValidationErrorStyle::Warning);
    let decimal = DataValidation::decimal(ValidationOperator::GreaterThan, 0.5, None)
        .unwrap()
        .with_allow_blank(false);
    let date = DataValidation::date(
        ValidationOperator::LessThanOrEqual,
        NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
        None,
    )
    .unwrap();
    let length = DataValidation::text_length(ValidationOperator::LessThan, 20, None).unwrap();
    let source = DataValidation::list_range("$Z$1:$Z$5");
    let custom = DataValidation::custom("ISNUMBER(A1)");

    sheet.add_validation(range("A1:A10"), list.clone());
    sheet.add_validation(range("B1"), whole.clone());
    sheet.add_validation(range("C1:C3"), decimal.clone());
    sheet.add_validation(range("D1"), date.clone());
    sheet.add_validation(range("E1"), length.clone());
    sheet.add_validation(range("F1"), source.clone());
    sheet.add_validation(range("G1"), custom.clone());

    let wb2 = roundtrip(&wb);
    let read = wb2.worksheet(0).unwrap().validations();

    assert_eq!(read.len(), 7);
    assert_eq!(read[0], (range("A1:A10"), list));
    assert_eq!(read[1], (range("B1"), whole));
    assert_eq!(read[2], (range("C1:C3"), decimal));
    assert_eq!(read[3], (range("D1"), date));
    assert_eq!(read[4], (range("E1"), length));
    assert_eq!(read[5], (range("F1"), source));
    assert_eq!(read[6].1.rule, ValidationRule::Custom("ISNUMBER(A1)".into()));
}

#[test]
fn test_validation_bounds_are_checked() {
    assert!(Criterion::new(ValidationOperator::Between, 1i64, None).is_err());
    assert!(Criterion::new(ValidationOperator::Equal, 1i64, Some(2)).is_err());
    assert!(Criterion::new(ValidationOperator::NotBetween, 1i64, Some(2)).is_ok());

    let list = DataValidation::list(["a", "b"]);
    assert_eq!(
        list.rule,
        ValidationRule::List(ListSource::Items(vec!["a".into(), "b".into()]))
    );
}

/// Charts of every kind come back with their anchor, title and series
#[test]
fn test_roundtrip_charts() {
    let mut wb = Workbook::new("Charts");
    let data = wb.add_worksheet("Data").unwrap();
    data.add_row(0, 0, ["Month", "North", "South"], StyleMerge::Preserve)
        .unwrap();
    for row in 1..=4u32 {
        data.add_row(
            row,
            0,
            [
                CellValue::text(format!("M{}", row)),
                CellValue::Integer(row as i64 * 10),
                CellValue::Number(row as f64 * 2.5),
            ],
            StyleMerge::Preserve,
        )
        .unwrap();
    }

    let north = Series::new(range("A2:A5"), range("B2:B5")).with_name("North");
    let south = Series::new(range("A2:A5"), range("C2:C5")).with_name("South");

    let bar = Chart::new(ChartKind::Bar(BarDirection::Bar))
        .with_title("By region")
        .with_position(range("E2:L16"))
        .with_series(north.clone())
        .with_series(south.clone());
    let line = Chart::line(LineOptions {
        marker: MarkerStyle::Circle,
        smooth: true,
    })
    .with_position(range("E18:L32"))
    .with_series(north.clone());
    data.add_chart(bar.clone());
    data.add_chart(line.clone());

    let summary = wb.add_worksheet("Summary").unwrap();
    let pie = Chart::pie()
        .with_title("Share")
        .with_position(range("B2:H12"))
        .with_data_sheet("Data")
        .with_series(Series::new(range("A2:A5"), range("B2:B5")));
    let scatter = Chart::scatter(MarkerStyle::Diamond)
        .with_position(range("B14:H24"))
        .with_data_sheet("Data")
        .with_series(Series::new(range("B2:B5"), range("C2:C5")).with_name("Spread"));
    summary.add_chart(pie.clone());
    summary.add_chart(scatter.clone());

    let wb2 = roundtrip(&wb);

    assert_eq!(wb2.worksheet(0).unwrap().charts(), &[bar, line]);
    assert_eq!(wb2.worksheet(1).unwrap().charts(), &[pie, scatter]);
}

#[test]
fn test_chart_with_unknown_data_sheet_is_rejected() {
    let mut wb = Workbook::new("Broken");
    wb.add_worksheet("Sheet1").unwrap().add_chart(
        Chart::bar()
            .with_data_sheet("Missing")
            .with_series(Series::new(range("A1:A3"), range("B1:B3"))),
    );

    let err = XlsxWriter::new().to_bytes(&wb).unwrap_err();
    assert!(matches!(
        err,
        XlsxError::Core(Error::UnknownChartSource { .. })
    ));
}

/// Frozen panes, hyperlinks and explicit sizes survive
#[test]
fn test_roundtrip_sheet_layout() {
    let mut wb = Workbook::new("Layout");
    let sheet = wb.add_worksheet("Sheet1").unwrap();
    sheet.freeze_panes(1, 2).unwrap();
    sheet.set_column_width(0, 30.0).unwrap();
    sheet.set_column_width(3, 8.5).unwrap();
    sheet.set_row_height(0, 24.0).unwrap();
    sheet.set_row_height(50, 40.0).unwrap();

    let link = Hyperlink::new("https://example.com/docs?a=1&b=2").with_display("Docs");
    sheet
        .add_cell(
            addr("B3"),
            "Docs",
            StyleMerge::Replace(Some(Style::new().italic(true).hyperlink(link.clone()))),
        )
        .unwrap();
    sheet
        .add_cell(
            addr("B4"),
            "Home",
            StyleMerge::Replace(Some(Style::new().hyperlink(Hyperlink::new("https://example.com")))),
        )
        .unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();

    assert_eq!(sheet2.freeze_pane(), Some(FreezePane { col: 1, row: 2 }));
    assert_eq!(sheet2.column_width(0), Some(30.0));
    assert_eq!(sheet2.column_width(3), Some(8.5));
    assert_eq!(sheet2.column_width(1), None);
    assert_eq!(sheet2.row_height(0), Some(24.0));
    assert_eq!(sheet2.row_height(50), Some(40.0));

    let b3 = sheet2.cell(addr("B3")).unwrap().style.clone().unwrap();
    assert!(b3.font.italic);
    assert_eq!(b3.hyperlink, Some(link));
    let b4 = sheet2.cell(addr("B4")).unwrap().style.clone().unwrap();
    assert_eq!(
        b4.hyperlink.as_ref().map(|h| h.url.as_str()),
        Some("https://example.com")
    );
}

#[test]
fn test_freeze_rows_only() {
    let mut wb = Workbook::new("Freeze");
    wb.add_worksheet("Sheet1").unwrap().freeze_panes(0, 1).unwrap();

    let wb2 = roundtrip(&wb);
    assert_eq!(
        wb2.worksheet(0).unwrap().freeze_pane(),
        Some(FreezePane { col: 0, row: 1 })
    );
}

#[test]
fn test_empty_workbook_is_rejected() {
    let wb = Workbook::new("Nothing");
    let err = XlsxWriter::new().to_bytes(&wb).unwrap_err();
    assert!(matches!(err, XlsxError::Core(Error::NoWorksheets)));
}

#[test]
fn test_non_finite_number_is_rejected() {
    let mut wb = Workbook::new("NaN");
    wb.add_worksheet("Sheet1")
        .unwrap()
        .set_value(addr("C7"), f64::NAN)
        .unwrap();

    let err = XlsxWriter::new().to_bytes(&wb).unwrap_err();
    assert!(matches!(err, XlsxError::Core(Error::NonFiniteNumber(_))));
}
