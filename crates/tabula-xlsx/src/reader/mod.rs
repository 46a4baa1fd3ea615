//! XLSX reader

mod chart;
mod sheet;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::read_styles_xml;
use crate::xml::{attr, decode_excel_escapes, rels_path, relationship_id, resolve_target};
use tabula_core::cell::parse_sheet_reference;
use tabula_core::{CellRange, Chart, Hyperlink, Series, Workbook, Worksheet, MAX_COLS};

use chart::{read_chart, read_drawing, ParsedChart};
use sheet::{apply_hyperlink, read_sheet, CellFormats, SheetExtras};

/// Title used when the package carries none and no file name is known
const UNTITLED: &str = "Workbook";

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const DEFAULT_CORE_PART: &str = "docProps/core.xml";

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path.
    ///
    /// Without a stored title the workbook is named after the file stem.
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let stem = path.file_stem().and_then(|s| s.to_str());
        read_package(file, stem)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        read_package(reader, None)
    }
}

/// One entry of a relationships part, with its target resolved
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

impl Relationship {
    fn is(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit_once('/')
            .is_some_and(|(_, last)| last == kind)
    }
}

fn find_rel<'r>(rels: &'r [Relationship], id: &str) -> Option<&'r Relationship> {
    rels.iter().find(|r| r.id == id)
}

/// The zip container with lookup helpers
struct Package<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    fn open(reader: R) -> XlsxResult<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }

    fn contains(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    fn part(&mut self, name: &str) -> XlsxResult<Option<impl Read + '_>> {
        match self.archive.by_name(name) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn xml(&mut self, name: &str) -> XlsxResult<Option<Reader<BufReader<impl Read + '_>>>> {
        Ok(self
            .part(name)?
            .map(|file| Reader::from_reader(BufReader::new(file))))
    }

    fn required_xml(&mut self, name: &str) -> XlsxResult<Reader<BufReader<impl Read + '_>>> {
        self.xml(name)?
            .ok_or_else(|| XlsxError::MissingPart(name.to_string()))
    }

    /// Relationships of `part`; a missing rels part means none
    fn relationships(&mut self, part: &str) -> XlsxResult<Vec<Relationship>> {
        let rels_part = rels_path(part);
        let Some(mut xml_reader) = self.xml(&rels_part)? else {
            return Ok(Vec::new());
        };
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = Vec::new();
        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let external = attr(&e, b"TargetMode").is_some_and(|m| m == "External");
                    match (attr(&e, b"Id"), attr(&e, b"Type"), attr(&e, b"Target")) {
                        (Some(id), Some(rel_type), Some(target)) => rels.push(Relationship {
                            id,
                            rel_type,
                            target: if external {
                                target
                            } else {
                                resolve_target(part, &target)
                            },
                            external,
                        }),
                        _ => log::warn!("{}: skipping incomplete relationship", rels_part),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(rels)
    }
}

fn read_package<R: Read + Seek>(reader: R, fallback_title: Option<&str>) -> XlsxResult<Workbook> {
    let mut package = Package::open(reader)?;

    if !package.contains("[Content_Types].xml") {
        return Err(XlsxError::MissingPart("[Content_Types].xml".into()));
    }

    let root_rels = package.relationships("")?;
    let workbook_part = match root_rels.iter().find(|r| r.is("officeDocument")) {
        Some(rel) => rel.target.clone(),
        None => workbook_part_from_content_types(&mut package)?,
    };
    let core_part = root_rels
        .iter()
        .find(|r| r.is("core-properties"))
        .map(|r| r.target.clone())
        .unwrap_or_else(|| DEFAULT_CORE_PART.to_string());

    let listing = read_workbook_part(package.required_xml(&workbook_part)?)?;
    if listing.sheets.is_empty() {
        return Err(XlsxError::parse(&workbook_part, "workbook lists no sheets"));
    }
    let workbook_rels = package.relationships(&workbook_part)?;

    let strings = match workbook_rels.iter().find(|r| r.is("sharedStrings")) {
        Some(rel) => match package.xml(&rel.target)? {
            Some(xml_reader) => read_shared_strings(xml_reader)?,
            None => return Err(XlsxError::MissingPart(rel.target.clone())),
        },
        None => Vec::new(),
    };

    let styles = match workbook_rels.iter().find(|r| r.is("styles")) {
        Some(rel) => match package.part(&rel.target)? {
            Some(file) => read_styles_xml(file, &rel.target)?,
            None => return Err(XlsxError::MissingPart(rel.target.clone())),
        },
        None => Vec::new(),
    };
    let formats = CellFormats::new(styles);

    let title = match package.xml(&core_part)? {
        Some(xml_reader) => read_core_title(xml_reader)?,
        None => None,
    };
    let title = title
        .or_else(|| fallback_title.map(str::to_string))
        .unwrap_or_else(|| UNTITLED.to_string());

    log::debug!(
        "reading '{}': {} sheet(s), {} shared string(s), {} cell format(s)",
        title,
        listing.sheets.len(),
        strings.len(),
        formats.len()
    );

    let mut workbook = Workbook::new(title);
    workbook.set_default_style(formats.default_style().clone());
    let sheet_names: Vec<&str> = listing.sheets.iter().map(|(name, _)| name.as_str()).collect();

    for (name, rel_id) in &listing.sheets {
        let sheet_part = find_rel(&workbook_rels, rel_id)
            .map(|r| r.target.clone())
            .ok_or_else(|| {
                XlsxError::parse(
                    &workbook_part,
                    format!("sheet '{}' has no relationship {}", name, rel_id),
                )
            })?;

        let sheet_rels = package.relationships(&sheet_part)?;
        let sheet = workbook.add_worksheet(name)?;
        let extras = read_sheet(
            package.required_xml(&sheet_part)?,
            &sheet_part,
            sheet,
            &strings,
            &formats,
        )?;

        apply_links(sheet, &extras, &sheet_rels, &sheet_part, formats.default_style())?;

        if let Some(drawing_id) = &extras.drawing {
            match find_rel(&sheet_rels, drawing_id) {
                Some(rel) if !rel.external => {
                    let drawing_part = rel.target.clone();
                    for chart in read_charts(&mut package, &drawing_part, name, &sheet_names)? {
                        sheet.add_chart(chart);
                    }
                }
                _ => log::warn!("{}: drawing relationship {} not found", sheet_part, drawing_id),
            }
        }
    }

    for (name, formula) in listing.defined_names {
        let added = parse_sheet_reference(&formula)
            .map_err(|e| e.to_string())
            .and_then(|(sheet, range)| {
                workbook
                    .add_named_range(&name, &sheet, range)
                    .map_err(|e| e.to_string())
            });
        if let Err(reason) = added {
            log::warn!("skipping defined name '{}' ({}): {}", name, formula, reason);
        }
    }

    Ok(workbook)
}

fn apply_links(
    sheet: &mut Worksheet,
    extras: &SheetExtras,
    sheet_rels: &[Relationship],
    sheet_part: &str,
    default_style: &tabula_core::Style,
) -> XlsxResult<()> {
    for link in &extras.hyperlinks {
        let target = link
            .rel_id
            .as_deref()
            .and_then(|id| find_rel(sheet_rels, id))
            .filter(|r| r.is("hyperlink"));
        let Some(target) = target else {
            log::warn!("{}: hyperlink on {} has no external target", sheet_part, link.addr);
            continue;
        };

        let mut hyperlink = Hyperlink::new(target.target.clone());
        if let Some(display) = &link.display {
            hyperlink = hyperlink.with_display(display.clone());
        }
        apply_hyperlink(sheet, link.addr, hyperlink, default_style)?;
    }
    Ok(())
}

/// Charts anchored in one drawing part
fn read_charts<R: Read + Seek>(
    package: &mut Package<R>,
    drawing_part: &str,
    owner: &str,
    sheet_names: &[&str],
) -> XlsxResult<Vec<Chart>> {
    let Some(xml_reader) = package.xml(drawing_part)? else {
        log::warn!("drawing part {} is missing", drawing_part);
        return Ok(Vec::new());
    };
    let anchors = read_drawing(xml_reader)?;
    let drawing_rels = package.relationships(drawing_part)?;

    let mut charts = Vec::new();
    for anchor in anchors {
        let Some(rel) = find_rel(&drawing_rels, &anchor.rel_id).filter(|r| r.is("chart")) else {
            log::warn!("{}: chart relationship {} not found", drawing_part, anchor.rel_id);
            continue;
        };
        let chart_part = rel.target.clone();
        let Some(xml_reader) = package.xml(&chart_part)? else {
            log::warn!("chart part {} is missing", chart_part);
            continue;
        };
        let Some(parsed) = read_chart(xml_reader)? else {
            continue;
        };

        let (c1, r1, c2, r2) = anchor.bounds();
        let col = |c: u32| c.min(MAX_COLS as u32 - 1) as u16;
        let position = CellRange::from_bounds(col(c1), r1, col(c2), r2);

        if let Some(chart) = build_chart(parsed, position, owner, sheet_names, &chart_part) {
            charts.push(chart);
        }
    }
    Ok(charts)
}

/// Resolve series references; a chart reads from a single data sheet
fn build_chart(
    parsed: ParsedChart,
    position: CellRange,
    owner: &str,
    sheet_names: &[&str],
    chart_part: &str,
) -> Option<Chart> {
    let mut data_sheet: Option<String> = None;
    let mut series = Vec::with_capacity(parsed.series.len());

    for (i, s) in parsed.series.into_iter().enumerate() {
        let refs = s
            .categories
            .as_deref()
            .zip(s.values.as_deref())
            .and_then(|(cat, val)| parse_sheet_reference(cat).ok().zip(parse_sheet_reference(val).ok()));
        let Some(((cat_sheet, categories), (val_sheet, values))) = refs else {
            log::warn!("{}: skipping series {} without usable ranges", chart_part, i);
            continue;
        };

        let sheet = data_sheet.get_or_insert_with(|| val_sheet.clone());
        if *sheet != cat_sheet || *sheet != val_sheet {
            log::warn!("{}: skipping series {} reading from another sheet", chart_part, i);
            continue;
        }

        let mut entry = Series::new(categories, values);
        entry.name = s.name;
        series.push(entry);
    }

    if let Some(sheet) = &data_sheet {
        if !sheet_names.iter().any(|n| *n == sheet.as_str()) {
            log::warn!("{}: skipping chart reading from unknown sheet '{}'", chart_part, sheet);
            return None;
        }
    }

    Some(Chart {
        kind: parsed.kind,
        title: parsed.title,
        position,
        data_sheet: data_sheet.filter(|s| s != owner),
        series,
    })
}

fn workbook_part_from_content_types<R: Read + Seek>(package: &mut Package<R>) -> XlsxResult<String> {
    let mut xml_reader = package.required_xml("[Content_Types].xml")?;
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Override" => {
                let is_workbook = attr(&e, b"ContentType")
                    .is_some_and(|t| t.ends_with(".sheet.main+xml") || t.ends_with(".template.main+xml"));
                if is_workbook {
                    if let Some(name) = attr(&e, b"PartName") {
                        return Ok(name.trim_start_matches('/').to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Err(XlsxError::MissingPart(DEFAULT_WORKBOOK_PART.to_string()))
}

/// Sheets in tab order plus defined names
#[derive(Debug, Default)]
struct WorkbookListing {
    sheets: Vec<(String, String)>,
    defined_names: Vec<(String, String)>,
}

fn read_workbook_part<R: std::io::BufRead>(mut xml_reader: Reader<R>) -> XlsxResult<WorkbookListing> {
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut listing = WorkbookListing::default();
    let mut defined: Option<(String, String)> = None;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rel_id)) = (attr(&e, b"name"), relationship_id(&e)) {
                    listing.sheets.push((name, rel_id));
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"definedName" => {
                match attr(&e, b"name") {
                    Some(name) if name.starts_with("_xlnm.") => {
                        log::debug!("ignoring built-in defined name {}", name)
                    }
                    Some(name) if attr(&e, b"localSheetId").is_some() => {
                        log::warn!("skipping sheet-scoped defined name '{}'", name)
                    }
                    Some(name) => defined = Some((name, String::new())),
                    None => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, formula)) = defined.as_mut() {
                    formula.push_str(&t.unescape()?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"definedName" => {
                if let Some(entry) = defined.take() {
                    listing.defined_names.push(entry);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(listing)
}

/// Shared string table; rich runs are concatenated, phonetic runs dropped
fn read_shared_strings<R: std::io::BufRead>(mut xml_reader: Reader<R>) -> XlsxResult<Vec<String>> {
    xml_reader.trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_t => current.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(decode_excel_escapes(&current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn read_core_title<R: std::io::BufRead>(mut xml_reader: Reader<R>) -> XlsxResult<Option<String>> {
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_title = false;
    let mut title = String::new();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"title" => in_title = true,
            Event::Text(t) if in_title => title.push_str(&t.unescape()?),
            Event::End(e) if e.local_name().as_ref() == b"title" => in_title = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((!title.is_empty()).then_some(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
        <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

    const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
        <sheets><sheet name="Only" sheetId="1" r:id="rId1"/></sheets>
        <definedNames>
          <definedName name="Block">Only!$A$1:$B$2</definedName>
          <definedName name="Rate">0.07</definedName>
          <definedName name="_xlnm.Print_Area" localSheetId="0">Only!$A$1:$C$9</definedName>
        </definedNames></workbook>"#;

    const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
        <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/></Relationships>"#;

    const SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
        <sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>hi</t></is></c></row></sheetData></worksheet>"#;

    #[test]
    fn test_minimal_external_package() {
        // No root rels, no styles, no shared strings
        let bytes = package(&[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ]);

        let wb = XlsxReader::read(Cursor::new(bytes)).unwrap();
        assert_eq!(wb.name(), UNTITLED);
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(
            wb.worksheet(0).unwrap().value(tabula_core::CellAddress::new(0, 0)),
            Some(&tabula_core::CellValue::Text("hi".into()))
        );

        // Only the range-valued, workbook-scoped name survives
        let names: Vec<&str> = wb.named_ranges().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["Block"]);
    }

    #[test]
    fn test_missing_parts() {
        let no_types = package(&[("xl/workbook.xml", WORKBOOK)]);
        assert!(matches!(
            XlsxReader::read(Cursor::new(no_types)),
            Err(XlsxError::MissingPart(p)) if p == "[Content_Types].xml"
        ));

        let no_sheet = package(&[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ]);
        assert!(matches!(
            XlsxReader::read(Cursor::new(no_sheet)),
            Err(XlsxError::MissingPart(p)) if p == "xl/worksheets/sheet1.xml"
        ));

        assert!(XlsxReader::read(Cursor::new(b"not a zip".to_vec())).is_err());
    }

    #[test]
    fn test_shared_strings_runs_and_phonetics() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <si><t>plain</t></si>
            <si><r><t>bold</t></r><r><t xml:space="preserve"> part</t></r></si>
            <si><t>漢字</t><rPh sb="0" eb="2"><t>カンジ</t></rPh></si>
            <si/>
            <si><t>a_x000D_b</t></si></sst>"#;
        let strings = read_shared_strings(Reader::from_str(xml)).unwrap();
        assert_eq!(strings, vec!["plain", "bold part", "漢字", "", "a\rb"]);
    }

    #[test]
    fn test_core_title() {
        let xml = r#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc"><dc:title>Q3 &amp; Q4</dc:title></cp:coreProperties>"#;
        assert_eq!(
            read_core_title(Reader::from_str(xml)).unwrap().as_deref(),
            Some("Q3 & Q4")
        );
    }

    #[test]
    fn test_build_chart_keeps_single_data_sheet() {
        use chart::ParsedSeries;
        use tabula_core::ChartKind;

        let parsed = ParsedChart {
            kind: ChartKind::Pie,
            title: None,
            series: vec![
                ParsedSeries {
                    name: Some("A".into()),
                    categories: Some("'Data'!$A$1:$A$3".into()),
                    values: Some("'Data'!$B$1:$B$3".into()),
                },
                ParsedSeries {
                    name: None,
                    categories: Some("Other!$A$1:$A$3".into()),
                    values: Some("Other!$B$1:$B$3".into()),
                },
            ],
        };
        let position = CellRange::parse("D2:J12").unwrap();
        let chart = build_chart(parsed, position, "Summary", &["Summary", "Data", "Other"], "c")
            .unwrap();

        assert_eq!(chart.data_sheet.as_deref(), Some("Data"));
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name.as_deref(), Some("A"));
        assert_eq!(chart.position, position);
    }
}
