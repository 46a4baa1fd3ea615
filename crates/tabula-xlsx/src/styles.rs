//! XLSX styles (styles.xml) read/write helpers

use std::io::{BufReader, Read};

use ahash::AHashMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr, attr_bool, attr_parse, escape_attr};
use tabula_core::style::number_format::{self, FIRST_CUSTOM_ID};
use tabula_core::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FontStyle, HorizontalAlignment,
    Style, StyleRegistry, VerticalAlignment,
};

// === Writing ===

/// Component tables derived from a style registry.
///
/// The registry id of each style is its `cellXfs` index.
#[derive(Debug)]
pub(crate) struct StyleTable<'a> {
    registry: &'a StyleRegistry,
    fonts: Vec<&'a FontStyle>,
    fills: Vec<Color>,
    borders: Vec<&'a BorderStyle>,
    numfmts: Vec<(u32, &'a str)>,
    xfs: Vec<XfIds>,
}

#[derive(Debug, Clone, Copy)]
struct XfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

/// Fills 0 and 1 are reserved for `none` and `gray125`
const FIRST_SOLID_FILL: u32 = 2;

impl<'a> StyleTable<'a> {
    pub(crate) fn build(registry: &'a StyleRegistry) -> Self {
        let mut fonts: Vec<&FontStyle> = Vec::new();
        let mut font_ids: AHashMap<&FontStyle, u32> = AHashMap::new();
        let mut fills: Vec<Color> = Vec::new();
        let mut fill_ids: AHashMap<Color, u32> = AHashMap::new();
        let mut borders: Vec<&BorderStyle> = Vec::new();
        let mut border_ids: AHashMap<&BorderStyle, u32> = AHashMap::new();
        let mut numfmts: Vec<(u32, &str)> = Vec::new();
        let mut numfmt_ids: AHashMap<&str, u32> = AHashMap::new();
        let mut xfs = Vec::with_capacity(registry.len());

        for (_, style) in registry.iter() {
            let font_id = *font_ids.entry(&style.font).or_insert_with(|| {
                fonts.push(&style.font);
                fonts.len() as u32 - 1
            });

            let fill_id = match style.fill {
                None => 0,
                Some(color) => *fill_ids.entry(color).or_insert_with(|| {
                    fills.push(color);
                    FIRST_SOLID_FILL + fills.len() as u32 - 1
                }),
            };

            let border_id = *border_ids.entry(&style.border).or_insert_with(|| {
                borders.push(&style.border);
                borders.len() as u32 - 1
            });

            let code = style.number_format.as_str();
            let num_fmt_id = match number_format::builtin_id(code) {
                Some(id) => id,
                None => *numfmt_ids.entry(code).or_insert_with(|| {
                    let id = FIRST_CUSTOM_ID + numfmts.len() as u32;
                    numfmts.push((id, code));
                    id
                }),
            };

            xfs.push(XfIds {
                font_id,
                fill_id,
                border_id,
                num_fmt_id,
            });
        }

        Self {
            registry,
            fonts,
            fills,
            borders,
            numfmts,
            xfs,
        }
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !self.numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", self.numfmts.len()));
            for (id, code) in &self.numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_attr(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", self.fonts.len()));
        for font in &self.fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!(
            "\n  <fills count=\"{}\">",
            self.fills.len() as u32 + FIRST_SOLID_FILL
        ));
        xml.push_str("\n    <fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("\n    <fill><patternFill patternType=\"gray125\"/></fill>");
        for color in &self.fills {
            xml.push_str("\n    ");
            xml.push_str(&write_solid_fill(color));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(&format!("\n  <borders count=\"{}\">", self.borders.len()));
        for border in &self.borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.xfs.len()));
        for ((_, style), ids) in self.registry.iter().zip(&self.xfs) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0"/>
</styleSheet>"#,
        );
        xml
    }
}

fn write_color(tag: &str, color: &Color) -> String {
    match color {
        Color::Auto => format!("<{tag} auto=\"1\"/>"),
        Color::Rgb { r, g, b } => format!("<{tag} rgb=\"FF{:02X}{:02X}{:02X}\"/>", r, g, b),
        Color::Indexed(i) => format!("<{tag} indexed=\"{}\"/>", i),
        Color::Theme { index, tint } if *tint == 0.0 => format!("<{tag} theme=\"{}\"/>", index),
        Color::Theme { index, tint } => format!("<{tag} theme=\"{}\" tint=\"{}\"/>", index, tint),
    }
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if !font.color.is_auto() {
        s.push_str(&write_color("color", &font.color));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_attr(&font.family)));
    s.push_str("</font>");
    s
}

fn write_solid_fill(color: &Color) -> String {
    format!(
        "<fill><patternFill patternType=\"solid\">{}<bgColor indexed=\"64\"/></patternFill></fill>",
        write_color("fgColor", color)
    )
}

fn write_border_edge(tag: &str, edge: &BorderEdge) -> String {
    match edge.style.as_xlsx() {
        None => format!("<{tag}/>"),
        Some(style) if edge.color.is_auto() => format!("<{tag} style=\"{style}\"/>"),
        Some(style) => format!(
            "<{tag} style=\"{style}\">{}</{tag}>",
            write_color("color", &edge.color)
        ),
    }
}

fn write_border(border: &BorderStyle) -> String {
    let mut s = String::from("<border>");
    s.push_str(&write_border_edge("left", &border.left));
    s.push_str(&write_border_edge("right", &border.right));
    s.push_str(&write_border_edge("top", &border.top));
    s.push_str(&write_border_edge("bottom", &border.bottom));
    s.push_str("<diagonal/></border>");
    s
}

fn write_alignment(al: &Alignment) -> String {
    if al.is_default() {
        return String::new();
    }

    let mut s = String::from("<alignment");
    if al.horizontal != HorizontalAlignment::General {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.as_xlsx()));
    }
    if al.vertical != VerticalAlignment::Bottom {
        s.push_str(&format!(" vertical=\"{}\"", al.vertical.as_xlsx()));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

fn write_xf(style: &Style, ids: XfIds) -> String {
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if ids.font_id != 0 {
        attrs.push_str(" applyFont=\"1\"");
    }
    if ids.fill_id != 0 {
        attrs.push_str(" applyFill=\"1\"");
    }
    if ids.border_id != 0 {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if !style.alignment.is_default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id, attrs
    );

    let alignment_xml = write_alignment(&style.alignment);
    if alignment_xml.is_empty() {
        s.push_str("/>");
    } else {
        s.push('>');
        s.push_str(&alignment_xml);
        s.push_str("</xf>");
    }
    s
}

// === Reading ===

#[derive(Debug, Default)]
struct XfRecord {
    num_fmt_id: u32,
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    alignment: Alignment,
}

/// Parser state for styles.xml
#[derive(Debug, Default)]
struct StylesParser {
    numfmts: AHashMap<u32, String>,
    fonts: Vec<FontStyle>,
    fills: Vec<Option<Color>>,
    borders: Vec<BorderStyle>,
    xfs: Vec<XfRecord>,

    in_dxfs: bool,
    in_cell_xfs: bool,
    current_font: Option<FontStyle>,
    current_fill: Option<(Option<String>, Color)>,
    in_fill: bool,
    current_border: Option<BorderStyle>,
    current_edge: Option<&'static str>,
    current_xf: Option<XfRecord>,
}

impl StylesParser {
    fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), String> {
        let name = e.local_name();
        if self.in_dxfs {
            if name.as_ref() == b"dxfs" && empty {
                self.in_dxfs = false;
            }
            return Ok(());
        }

        match name.as_ref() {
            b"dxfs" => self.in_dxfs = !empty,
            b"cellXfs" => self.in_cell_xfs = !empty,

            b"numFmt" => {
                if let (Some(id), Some(code)) =
                    (attr_parse::<u32>(e, b"numFmtId"), attr(e, b"formatCode"))
                {
                    self.numfmts.insert(id, code);
                }
            }

            b"font" => {
                if empty {
                    self.fonts.push(FontStyle::default());
                } else {
                    self.current_font = Some(FontStyle::default());
                }
            }
            b"b" | b"i" | b"sz" | b"name" | b"color" if self.current_font.is_some() => {
                if let Some(font) = self.current_font.as_mut() {
                    apply_font_property(font, name.as_ref(), e)?;
                }
            }

            b"fill" => {
                if empty {
                    self.fills.push(None);
                } else {
                    self.in_fill = true;
                }
            }
            b"patternFill" if self.in_fill => {
                self.current_fill = Some((attr(e, b"patternType"), Color::Auto));
            }
            b"fgColor" if self.in_fill => {
                if let Some((_, fg)) = self.current_fill.as_mut() {
                    *fg = parse_color_attrs(e)?;
                }
            }

            b"border" => {
                if empty {
                    self.borders.push(BorderStyle::default());
                } else {
                    self.current_border = Some(BorderStyle::default());
                }
            }
            b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom"
                if self.current_border.is_some() =>
            {
                let edge = edge_name(name.as_ref());
                if let Some(border) = self.current_border.as_mut() {
                    let style = attr(e, b"style")
                        .map(|s| BorderLineStyle::from_xlsx(&s))
                        .unwrap_or_default();
                    edge_mut(border, edge).style = style;
                }
                if !empty {
                    self.current_edge = Some(edge);
                }
            }
            b"color" if self.current_border.is_some() => {
                if let (Some(border), Some(edge)) = (self.current_border.as_mut(), self.current_edge)
                {
                    edge_mut(border, edge).color = parse_color_attrs(e)?;
                }
            }

            b"xf" if self.in_cell_xfs => {
                let record = XfRecord {
                    num_fmt_id: attr_parse(e, b"numFmtId").unwrap_or(0),
                    font_id: attr_parse(e, b"fontId").unwrap_or(0),
                    fill_id: attr_parse(e, b"fillId").unwrap_or(0),
                    border_id: attr_parse(e, b"borderId").unwrap_or(0),
                    alignment: Alignment::default(),
                };
                if empty {
                    self.xfs.push(record);
                } else {
                    self.current_xf = Some(record);
                }
            }
            b"alignment" => {
                if let Some(xf) = self.current_xf.as_mut() {
                    xf.alignment = parse_alignment(e);
                }
            }

            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        if self.in_dxfs {
            if name == b"dxfs" {
                self.in_dxfs = false;
            }
            return;
        }

        match name {
            b"cellXfs" => self.in_cell_xfs = false,
            b"font" => {
                if let Some(font) = self.current_font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" => {
                self.in_fill = false;
                let fill = match self.current_fill.take() {
                    Some((Some(pattern), fg)) if pattern == "solid" => Some(fg),
                    Some((Some(pattern), _)) if pattern != "none" && pattern != "gray125" => {
                        log::debug!("pattern fill '{}' read as no fill", pattern);
                        None
                    }
                    _ => None,
                };
                self.fills.push(fill);
            }
            b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom" => {
                self.current_edge = None;
            }
            b"border" => {
                if let Some(border) = self.current_border.take() {
                    self.borders.push(border);
                }
            }
            b"xf" => {
                if let Some(xf) = self.current_xf.take() {
                    self.xfs.push(xf);
                }
            }
            _ => {}
        }
    }

    fn resolve(self) -> Result<Vec<Style>, String> {
        if self.xfs.is_empty() {
            return Ok(vec![Style::default()]);
        }

        self.xfs
            .iter()
            .map(|xf| {
                let number_format = if let Some(code) = self.numfmts.get(&xf.num_fmt_id) {
                    code.clone()
                } else if let Some(code) = number_format::builtin_code(xf.num_fmt_id) {
                    code.to_string()
                } else {
                    log::debug!("unknown built-in number format {}", xf.num_fmt_id);
                    number_format::GENERAL.to_string()
                };

                Ok(Style {
                    font: lookup(&self.fonts, xf.font_id, "font")?,
                    fill: lookup(&self.fills, xf.fill_id, "fill")?,
                    border: lookup(&self.borders, xf.border_id, "border")?,
                    alignment: xf.alignment,
                    number_format,
                    hyperlink: None,
                })
            })
            .collect()
    }
}

/// Parse the styles part into the ordered list of cell formats (`cellXfs`).
///
/// A malformed color or a format pointing at a missing font, fill or border
/// is a parse error in `part`.
pub(crate) fn read_styles_xml<R: Read>(reader: R, part: &str) -> XlsxResult<Vec<Style>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut parser = StylesParser::default();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => parser
                .start(&e, false)
                .map_err(|m| XlsxError::parse(part, m))?,
            Event::Empty(e) => parser
                .start(&e, true)
                .map_err(|m| XlsxError::parse(part, m))?,
            Event::End(e) => parser.end(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser.resolve().map_err(|m| XlsxError::parse(part, m))
}

fn lookup<T: Clone>(items: &[T], id: u32, what: &str) -> Result<T, String> {
    items
        .get(id as usize)
        .cloned()
        .ok_or_else(|| format!("cell format references missing {} {}", what, id))
}

fn apply_font_property(font: &mut FontStyle, name: &[u8], e: &BytesStart<'_>) -> Result<(), String> {
    match name {
        b"b" => font.bold = attr_bool(e, b"val").unwrap_or(true),
        b"i" => font.italic = attr_bool(e, b"val").unwrap_or(true),
        b"sz" => {
            if let Some(size) = attr_parse(e, b"val") {
                font.size = size;
            }
        }
        b"name" => {
            if let Some(family) = attr(e, b"val") {
                font.family = family;
            }
        }
        b"color" => font.color = parse_color_attrs(e)?,
        _ => {}
    }
    Ok(())
}

fn parse_alignment(e: &BytesStart<'_>) -> Alignment {
    let mut al = Alignment::default();
    for a in e.attributes().flatten() {
        let Ok(value) = a.unescape_value() else {
            continue;
        };
        match a.key.as_ref() {
            b"horizontal" => al.horizontal = HorizontalAlignment::from_xlsx(&value),
            b"vertical" => al.vertical = VerticalAlignment::from_xlsx(&value),
            b"wrapText" => al.wrap_text = value == "1" || value == "true",
            _ => {}
        }
    }
    al
}

fn edge_name(name: &[u8]) -> &'static str {
    match name {
        b"left" | b"start" => "left",
        b"right" | b"end" => "right",
        b"top" => "top",
        _ => "bottom",
    }
}

fn edge_mut<'b>(border: &'b mut BorderStyle, edge: &str) -> &'b mut BorderEdge {
    match edge {
        "left" => &mut border.left,
        "right" => &mut border.right,
        "top" => &mut border.top,
        _ => &mut border.bottom,
    }
}

fn parse_color_attrs(e: &BytesStart<'_>) -> Result<Color, String> {
    // Priority: rgb > theme > indexed > auto
    let mut rgb: Option<String> = None;
    let mut theme: Option<u8> = None;
    let mut tint: Option<f64> = None;
    let mut indexed: Option<u8> = None;

    for a in e.attributes().flatten() {
        match a.key.as_ref() {
            b"rgb" => {
                rgb = a.unescape_value().ok().map(|s| s.to_string());
            }
            b"theme" => {
                theme = a.unescape_value().ok().and_then(|s| s.parse::<u8>().ok());
            }
            b"tint" => {
                tint = a
                    .unescape_value()
                    .ok()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|t| t.is_finite());
            }
            b"indexed" => {
                indexed = a.unescape_value().ok().and_then(|s| s.parse::<u8>().ok());
            }
            _ => {}
        }
    }

    if let Some(hex) = rgb {
        return Color::from_hex(&hex).ok_or_else(|| format!("invalid color rgb=\"{}\"", hex));
    }

    if let Some(index) = theme {
        let tint = tint.unwrap_or(0.0);
        return Ok(Color::Theme { index, tint });
    }

    if let Some(i) = indexed {
        return Ok(Color::Indexed(i));
    }

    Ok(Color::Auto)
}
