//! Worksheet part (xl/worksheets/sheetN.xml)

use std::collections::BTreeMap;

use tabula_core::validation::BoundValue;
use tabula_core::{
    CellAddress, CellRange, CellValue, Criterion, DataValidation, FreezePane, ListSource, Style,
    StyleRegistry, ValidationErrorStyle, ValidationRule, Worksheet,
};

use super::shared_strings::SharedStrings;
use crate::xml::{escape_attr, escape_text};

/// Resolved width of one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColumnWidth {
    pub(crate) width: f64,
    /// Set explicitly by the caller rather than auto-fitted
    pub(crate) custom: bool,
}

/// Serialized worksheet plus the external links its relationships must carry
#[derive(Debug)]
pub(crate) struct SheetPart {
    pub(crate) xml: String,
    /// Hyperlink targets; the n-th one is `rId{n+1}`
    pub(crate) hyperlinks: Vec<String>,
}

/// Per-save state shared by every sheet
pub(crate) struct SheetContext<'w, 'a> {
    pub(crate) default_style: &'a Style,
    pub(crate) registry: &'w mut StyleRegistry,
    pub(crate) strings: &'w mut SharedStrings<'a>,
}

pub(crate) fn write_sheet<'a>(
    sheet: &'a Worksheet,
    columns: &BTreeMap<u16, ColumnWidth>,
    has_drawing: bool,
    ctx: &mut SheetContext<'_, 'a>,
) -> SheetPart {
    let mut xml = String::with_capacity(1024 + sheet.cell_count() * 40);
    xml.push_str(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );

    let dimension = sheet
        .used_range()
        .map(|r| r.to_a1_string())
        .unwrap_or_else(|| "A1".to_string());
    xml.push_str(&format!("\n    <dimension ref=\"{}\"/>", dimension));

    xml.push_str("\n    <sheetViews>\n        <sheetView workbookViewId=\"0\"");
    match sheet.freeze_pane() {
        Some(pane) => {
            xml.push('>');
            xml.push_str(&pane_xml(pane));
            xml.push_str("</sheetView>");
        }
        None => xml.push_str("/>"),
    }
    xml.push_str("\n    </sheetViews>");
    xml.push_str("\n    <sheetFormatPr defaultRowHeight=\"15\"/>");

    if !columns.is_empty() {
        xml.push_str("\n    <cols>");
        for (col, width) in columns {
            let custom = if width.custom { " customWidth=\"1\"" } else { "" };
            xml.push_str(&format!(
                "\n        <col min=\"{n}\" max=\"{n}\" width=\"{}\"{}/>",
                width.width,
                custom,
                n = *col as u32 + 1
            ));
        }
        xml.push_str("\n    </cols>");
    }

    let hyperlinks = write_sheet_data(&mut xml, sheet, ctx);

    let merges = sheet.merges();
    if !merges.is_empty() {
        xml.push_str(&format!("\n    <mergeCells count=\"{}\">", merges.len()));
        for range in merges {
            xml.push_str(&format!(
                "\n        <mergeCell ref=\"{}\"/>",
                range.to_a1_string()
            ));
        }
        xml.push_str("\n    </mergeCells>");
    }

    let validations = sheet.validations();
    if !validations.is_empty() {
        xml.push_str(&format!(
            "\n    <dataValidations count=\"{}\">",
            validations.len()
        ));
        for (range, validation) in validations {
            xml.push_str(&validation_xml(range, validation));
        }
        xml.push_str("\n    </dataValidations>");
    }

    let mut targets = Vec::with_capacity(hyperlinks.len());
    if !hyperlinks.is_empty() {
        xml.push_str("\n    <hyperlinks>");
        for (i, (addr, url, display)) in hyperlinks.into_iter().enumerate() {
            let display = display
                .map(|d| format!(" display=\"{}\"", escape_attr(d)))
                .unwrap_or_default();
            xml.push_str(&format!(
                "\n        <hyperlink ref=\"{}\" r:id=\"rId{}\"{}/>",
                addr.to_a1_string(),
                i + 1,
                display
            ));
            targets.push(url.to_string());
        }
        xml.push_str("\n    </hyperlinks>");
    }

    xml.push_str(
        "\n    <pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/>",
    );

    if has_drawing {
        xml.push_str(&format!("\n    <drawing r:id=\"rId{}\"/>", targets.len() + 1));
    }

    xml.push_str("\n</worksheet>");

    SheetPart {
        xml,
        hyperlinks: targets,
    }
}

type LinkRef<'a> = (CellAddress, &'a str, Option<&'a str>);

/// Emit `<sheetData>`, interning styles and strings in row-major order.
/// Returns the hyperlinks found on the way.
fn write_sheet_data<'a>(
    xml: &mut String,
    sheet: &'a Worksheet,
    ctx: &mut SheetContext<'_, 'a>,
) -> Vec<LinkRef<'a>> {
    let mut links = Vec::new();
    let mut heights = sheet.row_heights().peekable();
    let mut current_row: Option<u32> = None;

    xml.push_str("\n    <sheetData>");

    for (addr, cell) in sheet.cells() {
        if current_row != Some(addr.row) {
            if current_row.is_some() {
                xml.push_str("\n        </row>");
            }
            while let Some((row, height)) = heights.next_if(|&(r, _)| r < addr.row) {
                xml.push_str(&format!("\n        {}", row_open(row, Some(height), true)));
            }
            let height = heights.next_if(|&(r, _)| r == addr.row).map(|(_, h)| h);
            xml.push_str(&format!("\n        {}", row_open(addr.row, height, false)));
            current_row = Some(addr.row);
        }

        let style = cell.effective_style(ctx.default_style);
        let xf_id = ctx.registry.intern(style);
        let style_attr = if xf_id != 0 {
            format!(" s=\"{}\"", xf_id)
        } else {
            String::new()
        };
        let cell_ref = addr.to_a1_string();

        if let Some(link) = cell.style.as_ref().and_then(|s| s.hyperlink.as_ref()) {
            links.push((addr, link.url.as_str(), link.display.as_deref()));
        }

        match &cell.value {
            CellValue::Text(s) => {
                let idx = ctx.strings.add(s);
                xml.push_str(&format!(
                    "\n            <c r=\"{}\"{} t=\"s\"><v>{}</v></c>",
                    cell_ref, style_attr, idx
                ));
            }
            CellValue::Integer(i) => {
                xml.push_str(&format!(
                    "\n            <c r=\"{}\"{}><v>{}</v></c>",
                    cell_ref, style_attr, i
                ));
            }
            CellValue::Number(n) => {
                // Debug formatting always keeps a `.` or exponent
                xml.push_str(&format!(
                    "\n            <c r=\"{}\"{}><v>{:?}</v></c>",
                    cell_ref, style_attr, n
                ));
            }
            CellValue::Boolean(b) => {
                xml.push_str(&format!(
                    "\n            <c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                    cell_ref,
                    style_attr,
                    if *b { 1 } else { 0 }
                ));
            }
            CellValue::DateTime(dt) => {
                xml.push_str(&format!(
                    "\n            <c r=\"{}\"{}><v>{:?}</v></c>",
                    cell_ref,
                    style_attr,
                    tabula_core::datetime_to_serial(dt)
                ));
            }
            CellValue::Formula(text) => {
                let formula_text = text.strip_prefix('=').unwrap_or(text);
                xml.push_str(&format!(
                    "\n            <c r=\"{}\"{}><f>{}</f></c>",
                    cell_ref,
                    style_attr,
                    escape_text(formula_text)
                ));
            }
            CellValue::Empty => {
                xml.push_str(&format!("\n            <c r=\"{}\"{}/>", cell_ref, style_attr));
            }
        }
    }

    if current_row.is_some() {
        xml.push_str("\n        </row>");
    }
    for (row, height) in heights {
        xml.push_str(&format!("\n        {}", row_open(row, Some(height), true)));
    }

    xml.push_str("\n    </sheetData>");
    links
}

fn row_open(row: u32, height: Option<f64>, empty: bool) -> String {
    let height = height
        .map(|h| format!(" ht=\"{}\" customHeight=\"1\"", h))
        .unwrap_or_default();
    let close = if empty { "/>" } else { ">" };
    format!("<row r=\"{}\"{}{}", row + 1, height, close)
}

fn pane_xml(pane: FreezePane) -> String {
    let active = match (pane.col > 0, pane.row > 0) {
        (true, true) => "bottomRight",
        (false, true) => "bottomLeft",
        _ => "topRight",
    };

    let mut s = String::from("<pane");
    if pane.col > 0 {
        s.push_str(&format!(" xSplit=\"{}\"", pane.col));
    }
    if pane.row > 0 {
        s.push_str(&format!(" ySplit=\"{}\"", pane.row));
    }
    s.push_str(&format!(
        " topLeftCell=\"{}\" activePane=\"{}\" state=\"frozen\"/><selection pane=\"{}\"/>",
        CellAddress::new(pane.col, pane.row).to_a1_string(),
        active,
        active
    ));
    s
}

fn validation_xml(range: &CellRange, validation: &DataValidation) -> String {
    let rule = &validation.rule;
    let (operator, formula1, formula2) = match rule {
        ValidationRule::List(ListSource::Items(items)) => {
            let joined = items
                .iter()
                .map(|item| item.replace('"', "\"\""))
                .collect::<Vec<_>>()
                .join(",");
            (None, format!("\"{}\"", joined), None)
        }
        ValidationRule::List(ListSource::Range(formula)) | ValidationRule::Custom(formula) => {
            (None, formula.trim_start_matches('=').to_string(), None)
        }
        ValidationRule::WholeNumber(c) => criterion_formulas(c),
        ValidationRule::DecimalNumber(c) => criterion_formulas(c),
        ValidationRule::Date(c) => criterion_formulas(c),
        ValidationRule::TextLength(c) => criterion_formulas(c),
    };

    let mut attrs = format!(" type=\"{}\"", rule.xlsx_type());
    if let Some(op) = operator {
        attrs.push_str(&format!(" operator=\"{}\"", op));
    }
    if validation.error_style != ValidationErrorStyle::Stop {
        attrs.push_str(&format!(
            " errorStyle=\"{}\"",
            validation.error_style.xlsx_style()
        ));
    }
    if validation.allow_blank {
        attrs.push_str(" allowBlank=\"1\"");
    }
    if validation.input_message.is_some() {
        attrs.push_str(" showInputMessage=\"1\"");
    }
    attrs.push_str(" showErrorMessage=\"1\"");
    if let Some(alert) = &validation.error_alert {
        attrs.push_str(&format!(
            " errorTitle=\"{}\" error=\"{}\"",
            escape_attr(&alert.title),
            escape_attr(&alert.body)
        ));
    }
    if let Some(prompt) = &validation.input_message {
        attrs.push_str(&format!(
            " promptTitle=\"{}\" prompt=\"{}\"",
            escape_attr(&prompt.title),
            escape_attr(&prompt.body)
        ));
    }

    let mut s = format!(
        "\n        <dataValidation{} sqref=\"{}\">",
        attrs,
        range.to_a1_string()
    );
    s.push_str(&format!(
        "\n            <formula1>{}</formula1>",
        escape_text(&formula1)
    ));
    if let Some(f2) = formula2 {
        s.push_str(&format!(
            "\n            <formula2>{}</formula2>",
            escape_text(&f2)
        ));
    }
    s.push_str("\n        </dataValidation>");
    s
}

fn criterion_formulas<T: BoundValue>(
    c: &Criterion<T>,
) -> (Option<&'static str>, String, Option<String>) {
    (
        Some(c.operator().xlsx_operator()),
        c.first().to_formula(),
        c.second().map(BoundValue::to_formula),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{Hyperlink, StyleMerge, ValidationOperator, Workbook};

    fn render(sheet: &Worksheet, columns: &BTreeMap<u16, ColumnWidth>) -> (SheetPart, usize) {
        let default = Style::default();
        let mut registry = StyleRegistry::new(&default);
        let mut strings = SharedStrings::new();
        let mut ctx = SheetContext {
            default_style: &default,
            registry: &mut registry,
            strings: &mut strings,
        };
        let part = write_sheet(sheet, columns, false, &mut ctx);
        (part, registry.len())
    }

    #[test]
    fn test_cell_encodings() {
        let mut wb = Workbook::new("t");
        let sheet = wb.add_worksheet("S").unwrap();
        sheet.set_value(CellAddress::new(0, 0), "text").unwrap();
        sheet.set_value(CellAddress::new(1, 0), 42).unwrap();
        sheet.set_value(CellAddress::new(2, 0), 2.0).unwrap();
        sheet.set_value(CellAddress::new(3, 0), true).unwrap();
        sheet
            .set_value(CellAddress::new(4, 0), CellValue::formula("SUM(B1:C1)"))
            .unwrap();

        let (part, _) = render(sheet, &BTreeMap::new());
        let xml = part.xml;
        assert!(xml.contains("<c r=\"A1\" t=\"s\"><v>0</v></c>"));
        assert!(xml.contains("<c r=\"B1\"><v>42</v></c>"));
        assert!(xml.contains("<c r=\"C1\"><v>2.0</v></c>"));
        assert!(xml.contains("<c r=\"D1\" t=\"b\"><v>1</v></c>"));
        assert!(xml.contains("<c r=\"E1\"><f>SUM(B1:C1)</f></c>"));
        assert!(xml.contains("<dimension ref=\"A1:E1\"/>"));
    }

    #[test]
    fn test_row_heights_without_cells_are_emitted() {
        let mut wb = Workbook::new("t");
        let sheet = wb.add_worksheet("S").unwrap();
        sheet.set_row_height(0, 30.0).unwrap();
        sheet.set_value(CellAddress::new(0, 2), 1).unwrap();
        sheet.set_row_height(2, 12.5).unwrap();
        sheet.set_row_height(7, 40.0).unwrap();

        let (part, _) = render(sheet, &BTreeMap::new());
        let xml = part.xml;
        let first = xml.find("<row r=\"1\" ht=\"30\" customHeight=\"1\"/>").unwrap();
        let third = xml.find("<row r=\"3\" ht=\"12.5\" customHeight=\"1\">").unwrap();
        let eighth = xml.find("<row r=\"8\" ht=\"40\" customHeight=\"1\"/>").unwrap();
        assert!(first < third && third < eighth);
    }

    #[test]
    fn test_columns_mark_custom_widths() {
        let mut wb = Workbook::new("t");
        let sheet = wb.add_worksheet("S").unwrap();
        let mut columns = BTreeMap::new();
        columns.insert(0, ColumnWidth { width: 20.0, custom: true });
        columns.insert(2, ColumnWidth { width: 7.5, custom: false });

        let (part, _) = render(sheet, &columns);
        assert!(part
            .xml
            .contains("<col min=\"1\" max=\"1\" width=\"20\" customWidth=\"1\"/>"));
        assert!(part.xml.contains("<col min=\"3\" max=\"3\" width=\"7.5\"/>"));
    }

    #[test]
    fn test_hyperlinks_and_shared_formats() {
        let mut wb = Workbook::new("t");
        let sheet = wb.add_worksheet("S").unwrap();
        let bold = Style::new().bold(true);
        sheet
            .add_cell(CellAddress::new(0, 0), "a", StyleMerge::Replace(Some(bold.clone())))
            .unwrap();
        sheet
            .add_cell(
                CellAddress::new(0, 1),
                "b",
                StyleMerge::Replace(Some(
                    bold.hyperlink(Hyperlink::new("https://example.com").with_display("site")),
                )),
            )
            .unwrap();

        let (part, styles) = render(sheet, &BTreeMap::new());
        assert_eq!(styles, 2);
        assert_eq!(part.hyperlinks, vec!["https://example.com".to_string()]);
        assert!(part
            .xml
            .contains("<hyperlink ref=\"A2\" r:id=\"rId1\" display=\"site\"/>"));
    }

    #[test]
    fn test_freeze_pane_rows_only() {
        assert_eq!(
            pane_xml(FreezePane { col: 0, row: 1 }),
            "<pane ySplit=\"1\" topLeftCell=\"A2\" activePane=\"bottomLeft\" state=\"frozen\"/><selection pane=\"bottomLeft\"/>"
        );
    }

    #[test]
    fn test_validation_markup() {
        let range = CellRange::parse("B2:B10").unwrap();
        let list = DataValidation::list(["Yes", "No \"way\""]).with_input_message("Pick", "One");
        let xml = validation_xml(&range, &list);
        assert!(xml.contains("type=\"list\""));
        assert!(!xml.contains("operator="));
        assert!(xml.contains("promptTitle=\"Pick\" prompt=\"One\""));
        assert!(xml.contains("<formula1>&quot;Yes,No &quot;&quot;way&quot;&quot;&quot;</formula1>"));

        let whole = DataValidation::whole_number(ValidationOperator::Between, 1, Some(10))
            .unwrap()
            .with_error_style(ValidationErrorStyle::Warning)
            .with_error_alert("Bad", "1 to 10");
        let xml = validation_xml(&range, &whole);
        assert!(xml.contains("type=\"whole\" operator=\"between\" errorStyle=\"warning\""));
        assert!(xml.contains("<formula1>1</formula1>"));
        assert!(xml.contains("<formula2>10</formula2>"));
        assert!(xml.contains("errorTitle=\"Bad\" error=\"1 to 10\""));
    }
}
