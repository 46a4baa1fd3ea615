//! XLSX writer

mod chart;
mod shared_strings;
mod sheet;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::XlsxResult;
use crate::styles::StyleTable;
use crate::xml::{escape_attr, escape_text};
use tabula_core::autofit::{auto_fit_columns, default_metrics, FontMetrics};
use tabula_core::{ColumnSizing, StyleRegistry, Workbook, Worksheet};

use shared_strings::SharedStrings;
use sheet::{ColumnWidth, SheetContext, SheetPart};

/// XLSX file writer
///
/// Holds the font metrics used to auto-fit columns that have no explicit
/// width. Everything else is derived from the workbook on each call.
pub struct XlsxWriter {
    metrics: Box<dyn FontMetrics>,
}

impl Default for XlsxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for XlsxWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxWriter").finish_non_exhaustive()
    }
}

/// Sheet-level drawing bookkeeping
#[derive(Debug)]
struct DrawingPlan {
    sheet_index: usize,
    number: usize,
    chart_numbers: Vec<usize>,
}

impl XlsxWriter {
    /// Writer using the default font metrics
    pub fn new() -> Self {
        Self {
            metrics: default_metrics(),
        }
    }

    /// Writer measuring auto-fit text with `metrics`
    pub fn with_font_metrics(metrics: Box<dyn FontMetrics>) -> Self {
        Self { metrics }
    }

    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(&self, workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        self.write(workbook, file)
    }

    /// Write a workbook into an in-memory buffer
    pub fn to_bytes(&self, workbook: &Workbook) -> XlsxResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.write(workbook, &mut buf)?;
        Ok(buf.into_inner())
    }

    /// Write a workbook to a writer.
    ///
    /// The model is validated first; nothing is written if that fails.
    pub fn write<W: Write + Seek>(&self, workbook: &Workbook, writer: W) -> XlsxResult<()> {
        workbook.validate()?;

        let default_style = workbook.default_style();
        let mut registry = StyleRegistry::new(default_style);
        let mut strings = SharedStrings::new();

        let drawings = plan_drawings(workbook);

        // Sheets are rendered first: rendering fills the style registry and
        // the shared string table in traversal order.
        let mut sheets: Vec<SheetPart> = Vec::with_capacity(workbook.sheet_count());
        {
            let mut ctx = SheetContext {
                default_style,
                registry: &mut registry,
                strings: &mut strings,
            };
            for (i, ws) in workbook.worksheets().enumerate() {
                let columns = self.resolve_column_widths(ws, workbook);
                let has_drawing = drawings.iter().any(|d| d.sheet_index == i);
                sheets.push(sheet::write_sheet(ws, &columns, has_drawing, &mut ctx));
            }
        }

        let style_table = StyleTable::build(&registry);
        log::debug!(
            "writing {} sheet(s), {} cell format(s), {} shared string(s), {} chart(s)",
            sheets.len(),
            registry.len(),
            strings.len(),
            drawings.iter().map(|d| d.chart_numbers.len()).sum::<usize>()
        );

        let mut zip = ZipWriter::new(writer);

        write_part(&mut zip, "[Content_Types].xml", &content_types_xml(workbook, &drawings))?;
        write_part(&mut zip, "_rels/.rels", ROOT_RELS)?;
        write_part(&mut zip, "docProps/core.xml", &core_xml(workbook))?;
        write_part(&mut zip, "docProps/app.xml", APP_XML)?;
        write_part(&mut zip, "xl/workbook.xml", &workbook_xml(workbook))?;
        write_part(&mut zip, "xl/_rels/workbook.xml.rels", &workbook_rels_xml(workbook))?;
        write_part(&mut zip, "xl/styles.xml", &style_table.to_styles_xml())?;
        write_part(&mut zip, "xl/sharedStrings.xml", &strings.to_xml())?;

        for (i, part) in sheets.iter().enumerate() {
            write_part(&mut zip, &format!("xl/worksheets/sheet{}.xml", i + 1), &part.xml)?;

            let drawing = drawings.iter().find(|d| d.sheet_index == i);
            if let Some(rels) = sheet_rels_xml(&part.hyperlinks, drawing.map(|d| d.number)) {
                write_part(
                    &mut zip,
                    &format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1),
                    &rels,
                )?;
            }
        }

        for plan in &drawings {
            let Some(ws) = workbook.worksheet(plan.sheet_index) else {
                continue;
            };
            write_part(
                &mut zip,
                &format!("xl/drawings/drawing{}.xml", plan.number),
                &chart::drawing_xml(ws.charts()),
            )?;
            write_part(
                &mut zip,
                &format!("xl/drawings/_rels/drawing{}.xml.rels", plan.number),
                &chart::drawing_rels_xml(&plan.chart_numbers),
            )?;
            for (c, number) in ws.charts().iter().zip(&plan.chart_numbers) {
                write_part(
                    &mut zip,
                    &format!("xl/charts/chart{}.xml", number),
                    &chart::chart_xml(c, ws.name()),
                )?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    /// Explicit widths pass through; the rest are auto-fitted unless the
    /// sheet opts out.
    fn resolve_column_widths(
        &self,
        sheet: &Worksheet,
        workbook: &Workbook,
    ) -> BTreeMap<u16, ColumnWidth> {
        let mut columns: BTreeMap<u16, ColumnWidth> = sheet
            .column_widths()
            .map(|(col, width)| (col, ColumnWidth { width, custom: true }))
            .collect();

        if let ColumnSizing::Auto { calibration_factor } = sheet.column_sizing() {
            let fitted = auto_fit_columns(
                sheet,
                workbook.default_style(),
                self.metrics.as_ref(),
                calibration_factor,
            );
            for (col, width) in fitted {
                columns.entry(col).or_insert(ColumnWidth {
                    width: (width * 100.0).round() / 100.0,
                    custom: false,
                });
            }
        }

        columns
    }
}

/// Number drawings per sheet that has charts, and charts across the workbook
fn plan_drawings(workbook: &Workbook) -> Vec<DrawingPlan> {
    let mut plans = Vec::new();
    let mut next_chart = 1;

    for (sheet_index, ws) in workbook.worksheets().enumerate() {
        let count = ws.charts().len();
        if count == 0 {
            continue;
        }
        plans.push(DrawingPlan {
            sheet_index,
            number: plans.len() + 1,
            chart_numbers: (next_chart..next_chart + count).collect(),
        });
        next_chart += count;
    }

    plans
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    content: &str,
) -> XlsxResult<()> {
    // Fixed timestamps keep repeated saves byte-identical
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    zip.start_file(name, options)?;
    zip.write_all(content.as_bytes())?;
    log::trace!("wrote part {} ({} bytes)", name, content.len());
    Ok(())
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>tabula</Application>
</Properties>"#;

fn content_types_xml(workbook: &Workbook, drawings: &[DrawingPlan]) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
    <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
    );

    for i in 0..workbook.sheet_count() {
        content.push_str(&format!(
            r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }

    for plan in drawings {
        content.push_str(&format!(
            r#"
    <Override PartName="/xl/drawings/drawing{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#,
            plan.number
        ));
        for n in &plan.chart_numbers {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/charts/chart{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawingml.chart+xml"/>"#,
                n
            ));
        }
    }

    content.push_str("\n</Types>");
    content
}

fn core_xml(workbook: &Workbook) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>{}</dc:title>
    <dc:creator>tabula</dc:creator>
</cp:coreProperties>"#,
        escape_text(workbook.name())
    )
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <bookViews>
        <workbookView activeTab="0"/>
    </bookViews>
    <sheets>"#,
    );

    for (i, sheet) in workbook.worksheets().enumerate() {
        content.push_str(&format!(
            r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_attr(sheet.name()),
            i + 1,
            i + 1
        ));
    }
    content.push_str("\n    </sheets>");

    let names = workbook.named_ranges();
    if !names.is_empty() {
        content.push_str("\n    <definedNames>");
        for named in names {
            content.push_str(&format!(
                "\n        <definedName name=\"{}\">{}</definedName>",
                escape_attr(named.name()),
                escape_text(&named.formula())
            ));
        }
        content.push_str("\n    </definedNames>");
    }

    // No cached results are written, so consumers recompute on open
    content.push_str("\n    <calcPr calcId=\"0\" fullCalcOnLoad=\"1\"/>\n</workbook>");
    content
}

fn workbook_rels_xml(workbook: &Workbook) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );

    let count = workbook.sheet_count();
    for i in 0..count {
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }

    content.push_str(&format!(
        r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#,
        count + 1,
        count + 2
    ));
    content
}

/// Sheet relationships: hyperlinks take `rId1..N`, the drawing `rId{N+1}`
fn sheet_rels_xml(hyperlinks: &[String], drawing: Option<usize>) -> Option<String> {
    if hyperlinks.is_empty() && drawing.is_none() {
        return None;
    }

    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, url) in hyperlinks.iter().enumerate() {
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
            i + 1,
            escape_attr(url)
        ));
    }
    if let Some(n) = drawing {
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing{}.xml"/>"#,
            hyperlinks.len() + 1,
            n
        ));
    }
    content.push_str("\n</Relationships>");
    Some(content)
}
