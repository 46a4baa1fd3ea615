//! Drawing anchors and chart parts
//!
//! Charts are read best-effort. Anything the model cannot express is
//! logged and skipped instead of failing the load.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{attr, relationship_id};
use tabula_core::{BarDirection, ChartKind, LineOptions, MarkerStyle};

/// Grid position of one anchor marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AnchorPoint {
    pub(crate) col: u32,
    pub(crate) row: u32,
    /// Whether the marker sits inside the cell rather than on its corner
    pub(crate) offset: bool,
}

/// A chart placed by a `twoCellAnchor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChartAnchor {
    pub(crate) from: AnchorPoint,
    pub(crate) to: AnchorPoint,
    pub(crate) rel_id: String,
}

impl ChartAnchor {
    /// Inclusive (col, row) bounds of the anchored rectangle.
    ///
    /// A `to` marker on a cell corner points one past the last covered cell.
    pub(crate) fn bounds(&self) -> (u32, u32, u32, u32) {
        let last = |end: u32, start: u32, offset: bool| {
            if !offset && end > start {
                end - 1
            } else {
                end
            }
        };
        (
            self.from.col,
            self.from.row,
            last(self.to.col, self.from.col, self.to.offset),
            last(self.to.row, self.from.row, self.to.offset),
        )
    }
}

/// Chart contents before references are resolved against sheets
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedChart {
    pub(crate) kind: ChartKind,
    pub(crate) title: Option<String>,
    pub(crate) series: Vec<ParsedSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParsedSeries {
    pub(crate) name: Option<String>,
    pub(crate) categories: Option<String>,
    pub(crate) values: Option<String>,
}

pub(crate) fn read_drawing<R: BufRead>(mut xml_reader: Reader<R>) -> XlsxResult<Vec<ChartAnchor>> {
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut anchors = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut from = AnchorPoint::default();
    let mut to = AnchorPoint::default();
    let mut rel_id: Option<String> = None;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"twoCellAnchor" {
                    from = AnchorPoint::default();
                    to = AnchorPoint::default();
                    rel_id = None;
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"chart" {
                    rel_id = relationship_id(&e);
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if let [.., parent, leaf] = stack.as_slice() {
                    let point = match parent.as_slice() {
                        b"from" => Some(&mut from),
                        b"to" => Some(&mut to),
                        _ => None,
                    };
                    if let Some(point) = point {
                        set_marker_field(point, leaf, text.trim());
                    }
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"twoCellAnchor" => match rel_id.take() {
                        Some(rel_id) => anchors.push(ChartAnchor { from, to, rel_id }),
                        None => log::debug!("skipping drawing anchor without a chart"),
                    },
                    b"oneCellAnchor" | b"absoluteAnchor" => {
                        log::warn!("skipping drawing object with unsupported anchor type");
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(anchors)
}

fn set_marker_field(point: &mut AnchorPoint, field: &[u8], value: &str) {
    match field {
        b"col" => point.col = value.parse().unwrap_or(0),
        b"row" => point.row = value.parse().unwrap_or(0),
        b"colOff" | b"rowOff" => {
            point.offset |= value.parse::<i64>().map(|v| v != 0).unwrap_or(false)
        }
        _ => {}
    }
}

/// Plot families the model supports
#[derive(Debug, Clone, Copy, PartialEq)]
enum Plot {
    Bar,
    Line,
    Pie,
    Scatter,
}

/// Parse a chart part. `Ok(None)` means the chart type is not supported.
pub(crate) fn read_chart<R: BufRead>(mut xml_reader: Reader<R>) -> XlsxResult<Option<ParsedChart>> {
    xml_reader.trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();

    let mut plot: Option<Plot> = None;
    let mut unsupported: Option<String> = None;
    let mut in_plot = false;
    let mut direction = BarDirection::Column;
    let mut marker: Option<MarkerStyle> = None;
    let mut smooth = false;

    let mut title = String::new();
    let mut has_title = false;
    let mut series: Vec<ParsedSeries> = Vec::new();
    let mut current: Option<ParsedSeries> = None;

    loop {
        let event = xml_reader.read_event_into(&mut buf)?;
        let (start, empty) = match &event {
            Event::Start(e) => (Some(e), false),
            Event::Empty(e) => (Some(e), true),
            _ => (None, false),
        };

        if let Some(e) = start {
            let name = e.local_name().as_ref().to_vec();
            let in_series = current.is_some();
            match name.as_slice() {
                b"barChart" | b"lineChart" | b"pieChart" | b"scatterChart" if !empty => {
                    let kind = match name.as_slice() {
                        b"barChart" => Plot::Bar,
                        b"lineChart" => Plot::Line,
                        b"pieChart" => Plot::Pie,
                        _ => Plot::Scatter,
                    };
                    if plot.is_none() {
                        plot = Some(kind);
                        in_plot = true;
                    } else {
                        log::warn!("ignoring additional plot in combination chart");
                    }
                }
                b"title" if !empty && matches!(stack.last().map(Vec::as_slice), Some(b"chart")) => {
                    has_title = true;
                }
                b"ser" if in_plot && !empty => current = Some(ParsedSeries::default()),
                b"barDir" if in_plot => {
                    if let Some(v) = attr(e, b"val") {
                        direction = BarDirection::from_xlsx(&v);
                    }
                }
                b"symbol" if in_series && marker.is_none() => {
                    marker = attr(e, b"val").map(|v| MarkerStyle::from_xlsx(&v));
                }
                b"smooth" if in_series => {
                    smooth |= attr(e, b"val").map(|v| v == "1" || v == "true").unwrap_or(true);
                }
                other => {
                    if matches!(stack.last().map(Vec::as_slice), Some(b"plotArea"))
                        && other.ends_with(b"Chart")
                        && plot.is_none()
                        && unsupported.is_none()
                    {
                        unsupported = Some(String::from_utf8_lossy(other).into_owned());
                    }
                }
            }
            if !empty {
                stack.push(name);
            }
        }

        match event {
            Event::Text(t) => {
                let text = t.unescape()?;
                let leaf = stack.last().map(Vec::as_slice);
                let in_title = stack
                    .windows(2)
                    .any(|w| w[0] == b"chart" && w[1] == b"title");
                if in_title && current.is_none() && matches!(leaf, Some(b"t")) {
                    title.push_str(&text);
                } else if let Some(s) = current.as_mut() {
                    let section = stack
                        .iter()
                        .rev()
                        .find(|n| matches!(n.as_slice(), b"tx" | b"cat" | b"val" | b"xVal" | b"yVal"))
                        .map(Vec::as_slice);
                    match (section, leaf) {
                        (Some(b"tx"), Some(b"v")) if s.name.is_none() => {
                            s.name = Some(text.into_owned())
                        }
                        (Some(b"cat" | b"xVal"), Some(b"f")) => {
                            s.categories = Some(text.trim().to_string())
                        }
                        (Some(b"val" | b"yVal"), Some(b"f")) => {
                            s.values = Some(text.trim().to_string())
                        }
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"ser" => {
                        if let Some(s) = current.take() {
                            series.push(s);
                        }
                    }
                    b"barChart" | b"lineChart" | b"pieChart" | b"scatterChart" => in_plot = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let kind = match plot {
        Some(Plot::Bar) => ChartKind::Bar(direction),
        Some(Plot::Line) => ChartKind::Line(LineOptions {
            marker: marker.unwrap_or_default(),
            smooth,
        }),
        Some(Plot::Pie) => ChartKind::Pie,
        Some(Plot::Scatter) => ChartKind::Scatter(marker.unwrap_or_default()),
        None => {
            log::warn!(
                "skipping chart with unsupported type {}",
                unsupported.as_deref().unwrap_or("(none)")
            );
            return Ok(None);
        }
    };

    Ok(Some(ParsedChart {
        kind,
        title: (has_title && !title.is_empty()).then_some(title),
        series,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chart(xml: &str) -> Option<ParsedChart> {
        read_chart(Reader::from_str(xml)).unwrap()
    }

    #[test]
    fn test_anchor_bounds() {
        let xml = r#"<xdr:wsDr xmlns:xdr="x" xmlns:c="c" xmlns:r="r">
            <xdr:twoCellAnchor>
              <xdr:from><xdr:col>1</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>2</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
              <xdr:to><xdr:col>5</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>10</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
              <xdr:graphicFrame><a:graphic><a:graphicData><c:chart r:id="rId3"/></a:graphicData></a:graphic></xdr:graphicFrame>
            </xdr:twoCellAnchor>
            <xdr:twoCellAnchor>
              <xdr:from><xdr:col>0</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>0</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
              <xdr:to><xdr:col>3</xdr:col><xdr:colOff>9525</xdr:colOff><xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
              <xdr:pic/>
            </xdr:twoCellAnchor>
        </xdr:wsDr>"#;

        let anchors = read_drawing(Reader::from_str(xml)).unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].rel_id, "rId3");
        assert_eq!(anchors[0].bounds(), (1, 2, 4, 9));

        let with_offset = ChartAnchor {
            from: AnchorPoint::default(),
            to: AnchorPoint {
                col: 3,
                row: 4,
                offset: true,
            },
            rel_id: "rId1".into(),
        };
        assert_eq!(with_offset.bounds(), (0, 0, 3, 4));
    }

    #[test]
    fn test_line_chart() {
        let parsed = chart(
            r#"<c:chartSpace xmlns:c="c" xmlns:a="a"><c:chart>
            <c:title><c:tx><c:rich><a:p><a:r><a:t>Monthly </a:t></a:r><a:r><a:t>sales</a:t></a:r></a:p></c:rich></c:tx></c:title>
            <c:plotArea><c:lineChart>
              <c:ser><c:idx val="0"/><c:tx><c:v>North</c:v></c:tx>
                <c:marker><c:symbol val="diamond"/></c:marker>
                <c:cat><c:strRef><c:f>'Data'!$A$2:$A$13</c:f></c:strRef></c:cat>
                <c:val><c:numRef><c:f>'Data'!$B$2:$B$13</c:f></c:numRef></c:val>
                <c:smooth val="1"/></c:ser>
              <c:marker val="1"/>
            </c:lineChart></c:plotArea></c:chart></c:chartSpace>"#,
        )
        .unwrap();

        assert_eq!(
            parsed.kind,
            ChartKind::Line(LineOptions {
                marker: MarkerStyle::Diamond,
                smooth: true
            })
        );
        assert_eq!(parsed.title.as_deref(), Some("Monthly sales"));
        assert_eq!(
            parsed.series,
            vec![ParsedSeries {
                name: Some("North".into()),
                categories: Some("'Data'!$A$2:$A$13".into()),
                values: Some("'Data'!$B$2:$B$13".into()),
            }]
        );
    }

    #[test]
    fn test_horizontal_bar_without_title() {
        let parsed = chart(
            r#"<c:chartSpace xmlns:c="c"><c:chart><c:autoTitleDeleted val="1"/>
            <c:plotArea><c:barChart><c:barDir val="bar"/>
              <c:ser><c:cat><c:strRef><c:f>S!$A$1:$A$2</c:f></c:strRef></c:cat>
                <c:val><c:numRef><c:f>S!$B$1:$B$2</c:f></c:numRef></c:val></c:ser>
            </c:barChart></c:plotArea></c:chart></c:chartSpace>"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, ChartKind::Bar(BarDirection::Bar));
        assert_eq!(parsed.title, None);
        assert_eq!(parsed.series[0].name, None);
    }

    #[test]
    fn test_scatter_reads_x_and_y() {
        let parsed = chart(
            r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea><c:scatterChart>
              <c:ser><c:marker><c:symbol val="circle"/></c:marker>
                <c:xVal><c:numRef><c:f>S!$A$1:$A$9</c:f></c:numRef></c:xVal>
                <c:yVal><c:numRef><c:f>S!$B$1:$B$9</c:f></c:numRef></c:yVal></c:ser>
            </c:scatterChart></c:plotArea></c:chart></c:chartSpace>"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, ChartKind::Scatter(MarkerStyle::Circle));
        assert_eq!(parsed.series[0].categories.as_deref(), Some("S!$A$1:$A$9"));
    }

    #[test]
    fn test_unknown_chart_type_is_skipped() {
        assert!(chart(
            r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea><c:radarChart>
              <c:ser><c:val><c:numRef><c:f>S!$B$1:$B$2</c:f></c:numRef></c:val></c:ser>
            </c:radarChart></c:plotArea></c:chart></c:chartSpace>"#
        )
        .is_none());
    }
}
