//! Worksheet part parser

use std::io::BufRead;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr, attr_bool, attr_parse, decode_excel_escapes, relationship_id};
use tabula_core::validation::BoundValue;
use tabula_core::{
    serial_to_datetime, Cell, CellAddress, CellRange, CellValue, Criterion, DataValidation,
    Hyperlink, ListSource, Style, ValidationErrorStyle, ValidationMessage, ValidationOperator,
    ValidationRule, Worksheet, MAX_COLS, MAX_ROWS,
};

/// Cell formats by xf id. Id 0 is the workbook default and maps to "no style".
#[derive(Debug)]
pub(crate) struct CellFormats {
    styles: Vec<Arc<Style>>,
}

impl CellFormats {
    pub(crate) fn new(styles: Vec<Style>) -> Self {
        let mut styles: Vec<Arc<Style>> = styles.into_iter().map(Arc::new).collect();
        if styles.is_empty() {
            styles.push(Arc::new(Style::default()));
        }
        Self { styles }
    }

    pub(crate) fn default_style(&self) -> &Style {
        &self.styles[0]
    }

    pub(crate) fn len(&self) -> usize {
        self.styles.len()
    }

    /// `None` for an unknown id; `Some(None)` for the default format
    fn resolve(&self, id: u32) -> Option<Option<&Arc<Style>>> {
        match id {
            0 => Some(None),
            _ => self.styles.get(id as usize).map(Some),
        }
    }
}

/// A hyperlink whose target lives in the sheet's relationships
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingLink {
    pub(crate) addr: CellAddress,
    pub(crate) rel_id: Option<String>,
    pub(crate) display: Option<String>,
}

/// Sheet content that needs other parts to resolve
#[derive(Debug, Default)]
pub(crate) struct SheetExtras {
    pub(crate) hyperlinks: Vec<PendingLink>,
    pub(crate) drawing: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Value,
    Formula,
    InlineText,
    Formula1,
    Formula2,
}

#[derive(Debug, Default)]
struct PendingCell {
    addr: CellAddress,
    kind: Option<String>,
    style_id: u32,
    value: Option<String>,
    formula: Option<String>,
    inline: Option<String>,
}

#[derive(Debug, Default)]
struct PendingValidation {
    kind: String,
    operator: Option<String>,
    allow_blank: bool,
    error_style: Option<String>,
    prompt_title: Option<String>,
    prompt: Option<String>,
    error_title: Option<String>,
    error: Option<String>,
    sqref: Option<String>,
    formula1: Option<String>,
    formula2: Option<String>,
}

/// Parse one worksheet part into `sheet`
pub(crate) fn read_sheet<R: BufRead>(
    mut xml_reader: Reader<R>,
    part: &str,
    sheet: &mut Worksheet,
    strings: &[String],
    formats: &CellFormats,
) -> XlsxResult<SheetExtras> {
    // Whitespace inside <t> is significant
    xml_reader.trim_text(false);

    let mut buf = Vec::new();
    let mut parser = SheetParser {
        part,
        strings,
        formats,
        row: None,
        next_col: 0,
        cell: None,
        capture: Capture::None,
        in_inline: false,
        in_phonetic: false,
        validation: None,
        extras: SheetExtras::default(),
    };

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => parser.start(sheet, &e, false)?,
            Event::Empty(e) => parser.start(sheet, &e, true)?,
            Event::Text(t) => parser.text(&t.unescape()?),
            Event::End(e) => parser.end(sheet, e.local_name().as_ref())?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parser.extras)
}

struct SheetParser<'p> {
    part: &'p str,
    strings: &'p [String],
    formats: &'p CellFormats,
    row: Option<u32>,
    next_col: u32,
    cell: Option<PendingCell>,
    capture: Capture,
    in_inline: bool,
    in_phonetic: bool,
    validation: Option<PendingValidation>,
    extras: SheetExtras,
}

impl SheetParser<'_> {
    /// Frozen split position: a whole number of columns or rows below `limit`
    fn pane_split(&self, e: &BytesStart<'_>, key: &[u8], limit: u32) -> XlsxResult<u32> {
        let Some(raw) = attr(e, key) else {
            return Ok(0);
        };
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v < limit as f64)
            .map(|v| v as u32)
            .ok_or_else(|| {
                XlsxError::parse(
                    self.part,
                    format!(
                        "frozen pane {}=\"{}\" outside 0..{}",
                        String::from_utf8_lossy(key),
                        raw,
                        limit
                    ),
                )
            })
    }

    fn start(&mut self, sheet: &mut Worksheet, e: &BytesStart<'_>, empty: bool) -> XlsxResult<()> {
        match e.local_name().as_ref() {
            b"row" => {
                let row = match attr_parse::<u32>(e, b"r") {
                    Some(r) if r > 0 => r - 1,
                    _ => self.row.map_or(0, |r| r + 1),
                };
                self.row = Some(row);
                self.next_col = 0;

                if attr_bool(e, b"customHeight").unwrap_or(false) {
                    if let Some(height) = attr_parse::<f64>(e, b"ht") {
                        if let Err(err) = sheet.set_row_height(row, height) {
                            log::warn!("{}: ignoring height of row {}: {}", self.part, row + 1, err);
                        }
                    }
                }
            }
            b"c" => {
                let addr = match attr(e, b"r") {
                    Some(r) => CellAddress::parse(&r).map_err(|_| {
                        XlsxError::parse(self.part, format!("invalid cell reference '{}'", r))
                    })?,
                    None => {
                        let col = u16::try_from(self.next_col)
                            .ok()
                            .filter(|c| *c < MAX_COLS)
                            .ok_or_else(|| {
                                XlsxError::parse(self.part, "too many cells in row")
                            })?;
                        CellAddress::new(col, self.row.unwrap_or(0))
                    }
                };
                self.next_col = addr.col as u32 + 1;
                self.cell = Some(PendingCell {
                    addr,
                    kind: attr(e, b"t"),
                    style_id: attr_parse(e, b"s").unwrap_or(0),
                    ..Default::default()
                });
                if empty {
                    self.finish_cell(sheet)?;
                }
            }
            b"v" if self.cell.is_some() && !empty => self.capture = Capture::Value,
            b"f" if self.cell.is_some() => {
                if empty {
                    log::debug!("{}: shared formula without text, keeping cached value", self.part);
                } else {
                    self.capture = Capture::Formula;
                }
            }
            b"is" if !empty => self.in_inline = true,
            b"rPh" if !empty => self.in_phonetic = true,
            b"t" if self.in_inline && !self.in_phonetic && !empty => {
                self.capture = Capture::InlineText
            }
            b"col" => self.read_column(sheet, e),
            b"mergeCell" => {
                let Some(reference) = attr(e, b"ref") else {
                    return Ok(());
                };
                let range = CellRange::parse(&reference).map_err(|_| {
                    XlsxError::parse(self.part, format!("invalid merge range '{}'", reference))
                })?;
                sheet
                    .merge_cells(range)
                    .map_err(|err| XlsxError::parse(self.part, err.to_string()))?;
            }
            b"pane" => {
                let state = attr(e, b"state").unwrap_or_default();
                if state == "frozen" || state == "frozenSplit" {
                    let col = self.pane_split(e, b"xSplit", MAX_COLS as u32)?;
                    let row = self.pane_split(e, b"ySplit", MAX_ROWS)?;
                    // col < MAX_COLS after the check above
                    sheet
                        .freeze_panes(col as u16, row)
                        .map_err(|err| XlsxError::parse(self.part, err.to_string()))?;
                } else {
                    log::debug!("{}: ignoring unfrozen split pane", self.part);
                }
            }
            b"dataValidation" => {
                self.validation = Some(PendingValidation {
                    kind: attr(e, b"type").unwrap_or_else(|| "none".to_string()),
                    operator: attr(e, b"operator"),
                    allow_blank: attr_bool(e, b"allowBlank").unwrap_or(false),
                    error_style: attr(e, b"errorStyle"),
                    prompt_title: attr(e, b"promptTitle"),
                    prompt: attr(e, b"prompt"),
                    error_title: attr(e, b"errorTitle"),
                    error: attr(e, b"error"),
                    sqref: attr(e, b"sqref"),
                    ..Default::default()
                });
                if empty {
                    self.finish_validation(sheet);
                }
            }
            b"formula1" if self.validation.is_some() && !empty => self.capture = Capture::Formula1,
            b"formula2" if self.validation.is_some() && !empty => self.capture = Capture::Formula2,
            b"hyperlink" => {
                let Some(addr) = attr(e, b"ref")
                    .and_then(|r| CellRange::parse(&r).ok())
                    .map(|range| range.from())
                else {
                    log::warn!("{}: skipping hyperlink with invalid reference", self.part);
                    return Ok(());
                };
                self.extras.hyperlinks.push(PendingLink {
                    addr,
                    rel_id: relationship_id(e),
                    display: attr(e, b"display"),
                });
            }
            b"drawing" => self.extras.drawing = relationship_id(e),
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let slot = match self.capture {
            Capture::None => return,
            Capture::Value => self.cell.as_mut().map(|c| &mut c.value),
            Capture::Formula => self.cell.as_mut().map(|c| &mut c.formula),
            Capture::InlineText => self.cell.as_mut().map(|c| &mut c.inline),
            Capture::Formula1 => self.validation.as_mut().map(|v| &mut v.formula1),
            Capture::Formula2 => self.validation.as_mut().map(|v| &mut v.formula2),
        };
        if let Some(slot) = slot {
            slot.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn end(&mut self, sheet: &mut Worksheet, name: &[u8]) -> XlsxResult<()> {
        match name {
            b"v" | b"f" | b"t" | b"formula1" | b"formula2" => self.capture = Capture::None,
            b"is" => self.in_inline = false,
            b"rPh" => self.in_phonetic = false,
            b"c" => self.finish_cell(sheet)?,
            b"dataValidation" => self.finish_validation(sheet),
            _ => {}
        }
        Ok(())
    }

    fn read_column(&self, sheet: &mut Worksheet, e: &BytesStart<'_>) {
        // Widths written without customWidth were auto-fitted; they stay automatic
        if !attr_bool(e, b"customWidth").unwrap_or(false) {
            return;
        }
        let (Some(min), Some(max), Some(width)) = (
            attr_parse::<u32>(e, b"min"),
            attr_parse::<u32>(e, b"max"),
            attr_parse::<f64>(e, b"width"),
        ) else {
            return;
        };
        for col in min.max(1)..=max.min(MAX_COLS as u32) {
            if let Err(err) = sheet.set_column_width((col - 1) as u16, width) {
                log::warn!("{}: ignoring column width: {}", self.part, err);
                return;
            }
        }
    }

    fn finish_cell(&mut self, sheet: &mut Worksheet) -> XlsxResult<()> {
        self.capture = Capture::None;
        let Some(cell) = self.cell.take() else {
            return Ok(());
        };

        let style = self.formats.resolve(cell.style_id).ok_or_else(|| {
            XlsxError::parse(
                self.part,
                format!("cell {}: unknown style id {}", cell.addr, cell.style_id),
            )
        })?;
        let is_date = style
            .map_or(self.formats.default_style(), |s| &**s)
            .is_date_format();
        let value = self.cell_value(&cell, is_date)?;

        sheet.insert_cell(
            cell.addr,
            Cell {
                value,
                style: style.cloned(),
            },
        )?;
        Ok(())
    }

    fn cell_value(&self, cell: &PendingCell, is_date: bool) -> XlsxResult<CellValue> {
        if let Some(formula) = cell.formula.as_deref().filter(|f| !f.trim().is_empty()) {
            return Ok(CellValue::formula(formula));
        }

        let value = cell.value.as_deref();
        let value = match (cell.kind.as_deref(), value) {
            (Some("inlineStr"), _) => {
                CellValue::Text(decode_excel_escapes(cell.inline.as_deref().unwrap_or_default()))
            }
            (_, None) => CellValue::Empty,
            (Some("s"), Some(v)) => {
                let text = v
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.strings.get(idx))
                    .ok_or_else(|| {
                        XlsxError::parse(
                            self.part,
                            format!("cell {}: shared string index '{}' out of range", cell.addr, v),
                        )
                    })?;
                CellValue::Text(text.clone())
            }
            (Some("str"), Some(v)) => CellValue::Text(decode_excel_escapes(v)),
            (Some("b"), Some(v)) => CellValue::Boolean(v.trim() == "1" || v.trim() == "true"),
            (Some("e"), Some(v)) => {
                log::debug!("{}: cell {} holds error value {}", self.part, cell.addr, v);
                CellValue::Text(v.to_string())
            }
            (Some("d"), Some(v)) => parse_iso_datetime(v.trim())
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(v.to_string())),
            (_, Some(v)) => numeric_value(v.trim(), is_date).ok_or_else(|| {
                XlsxError::parse(
                    self.part,
                    format!("cell {}: invalid number '{}'", cell.addr, v),
                )
            })?,
        };
        Ok(value)
    }

    fn finish_validation(&mut self, sheet: &mut Worksheet) {
        self.capture = Capture::None;
        let Some(pending) = self.validation.take() else {
            return;
        };
        let Some(rule) = validation_rule(&pending) else {
            log::warn!(
                "{}: skipping {} validation on {} with unusable settings",
                self.part,
                pending.kind,
                pending.sqref.as_deref().unwrap_or("?")
            );
            return;
        };

        let mut validation = DataValidation::new(rule).with_allow_blank(pending.allow_blank);
        if pending.prompt_title.is_some() || pending.prompt.is_some() {
            validation.input_message = Some(ValidationMessage::new(
                pending.prompt_title.unwrap_or_default(),
                pending.prompt.unwrap_or_default(),
            ));
        }
        if pending.error_title.is_some() || pending.error.is_some() {
            validation.error_alert = Some(ValidationMessage::new(
                pending.error_title.unwrap_or_default(),
                pending.error.unwrap_or_default(),
            ));
        }
        if let Some(style) = pending.error_style.as_deref() {
            validation.error_style =
                ValidationErrorStyle::from_xlsx(style).unwrap_or(ValidationErrorStyle::Stop);
        }

        for reference in pending.sqref.as_deref().unwrap_or_default().split_whitespace() {
            match CellRange::parse(reference) {
                Ok(range) => sheet.add_validation(range, validation.clone()),
                Err(_) => log::warn!(
                    "{}: skipping validation on invalid range '{}'",
                    self.part,
                    reference
                ),
            }
        }
    }
}

/// Classify a numeric cell: dates by format, then whole numbers, then floats
fn numeric_value(v: &str, is_date: bool) -> Option<CellValue> {
    if v.is_empty() {
        return Some(CellValue::Empty);
    }
    if is_date {
        if let Some(dt) = v.parse::<f64>().ok().and_then(serial_to_datetime) {
            return Some(CellValue::DateTime(dt));
        }
    }
    if !v.contains(['.', 'e', 'E']) {
        if let Ok(i) = v.parse::<i64>() {
            return Some(CellValue::Integer(i));
        }
    }
    v.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(CellValue::Number)
}

fn parse_iso_datetime(v: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

fn validation_rule(v: &PendingValidation) -> Option<ValidationRule> {
    let formula1 = v.formula1.as_deref().map(str::trim);
    let formula2 = v.formula2.as_deref().map(str::trim);
    let operator = match v.operator.as_deref() {
        Some(op) => ValidationOperator::from_xlsx(op)?,
        None => ValidationOperator::Between,
    };

    let rule = match v.kind.as_str() {
        "list" => ValidationRule::List(list_source(formula1?)),
        "custom" => ValidationRule::Custom(formula1?.trim_start_matches('=').to_string()),
        "whole" => ValidationRule::WholeNumber(criterion(operator, formula1?, formula2)?),
        "decimal" => ValidationRule::DecimalNumber(criterion(operator, formula1?, formula2)?),
        "date" => ValidationRule::Date(criterion(operator, formula1?, formula2)?),
        "textLength" => ValidationRule::TextLength(criterion(operator, formula1?, formula2)?),
        _ => return None,
    };
    Some(rule)
}

fn criterion<T: BoundValue>(
    operator: ValidationOperator,
    formula1: &str,
    formula2: Option<&str>,
) -> Option<Criterion<T>> {
    let first = T::from_formula(formula1)?;
    // A stale second bound on a one-bound operator is ignored
    let second = match formula2 {
        Some(f) if operator.requires_two_values() => Some(T::from_formula(f)?),
        _ => None,
    };
    Criterion::new(operator, first, second).ok()
}

/// A quoted formula is a literal item list; anything else is a range
fn list_source(formula: &str) -> ListSource {
    match formula.strip_prefix('"').and_then(|f| f.strip_suffix('"')) {
        Some("") => ListSource::Items(Vec::new()),
        Some(inner) => ListSource::Items(
            inner
                .split(',')
                .map(|item| item.replace("\"\"", "\""))
                .collect(),
        ),
        None => ListSource::Range(formula.trim_start_matches('=').to_string()),
    }
}

/// Attach a hyperlink to `addr`, creating the cell when needed
pub(crate) fn apply_hyperlink(
    sheet: &mut Worksheet,
    addr: CellAddress,
    link: Hyperlink,
    default_style: &Style,
) -> XlsxResult<()> {
    let mut cell = sheet.cell(addr).cloned().unwrap_or_default();
    let style = cell.effective_style(default_style).clone().hyperlink(link);
    cell.style = Some(Arc::new(style));
    sheet.insert_cell(addr, cell)?;
    Ok(())
}
