//! Chart parts (xl/charts/chartN.xml) and the drawings that anchor them

use tabula_core::cell::sheet_reference;
use tabula_core::{BarDirection, Chart, ChartKind, MarkerStyle, Series};

use crate::xml::escape_text;

const CAT_AX_ID: u32 = 100000001;
const VAL_AX_ID: u32 = 100000002;

/// Chart part for `chart`, whose series default to `owner`'s data
pub(crate) fn chart_xml(chart: &Chart, owner: &str) -> String {
    let data_sheet = chart.data_sheet_or(owner);

    let mut xml = String::with_capacity(2048);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str("<c:chartSpace xmlns:c=\"http://schemas.openxmlformats.org/drawingml/2006/chart\" ");
    xml.push_str("xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ");
    xml.push_str("xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\n");
    xml.push_str("<c:roundedCorners val=\"0\"/>\n");
    xml.push_str("<c:chart>\n");

    match &chart.title {
        Some(title) => {
            xml.push_str("<c:title><c:tx><c:rich><a:bodyPr/><a:lstStyle/>");
            xml.push_str(&format!(
                "<a:p><a:r><a:t>{}</a:t></a:r></a:p>",
                escape_text(title)
            ));
            xml.push_str("</c:rich></c:tx><c:overlay val=\"0\"/></c:title>\n");
            xml.push_str("<c:autoTitleDeleted val=\"0\"/>\n");
        }
        None => xml.push_str("<c:autoTitleDeleted val=\"1\"/>\n"),
    }

    xml.push_str("<c:plotArea>\n<c:layout/>\n");
    match chart.kind {
        ChartKind::Bar(direction) => write_bar_plot(&mut xml, chart, direction, data_sheet),
        ChartKind::Line(options) => {
            xml.push_str("<c:lineChart>\n");
            xml.push_str("<c:grouping val=\"standard\"/>\n<c:varyColors val=\"0\"/>\n");
            for (i, series) in chart.series.iter().enumerate() {
                open_series(&mut xml, i, series);
                write_marker(&mut xml, options.marker);
                write_refs(&mut xml, "c:cat", "c:strRef", "c:val", series, data_sheet);
                xml.push_str(&format!(
                    "<c:smooth val=\"{}\"/>\n</c:ser>\n",
                    options.smooth as u8
                ));
            }
            xml.push_str("<c:marker val=\"1\"/>\n");
            write_ax_ids(&mut xml);
            xml.push_str("</c:lineChart>\n");
            write_cat_ax(&mut xml, "b");
            write_val_ax(&mut xml, VAL_AX_ID, CAT_AX_ID, "l", "between");
        }
        ChartKind::Pie => {
            xml.push_str("<c:pieChart>\n<c:varyColors val=\"1\"/>\n");
            for (i, series) in chart.series.iter().enumerate() {
                open_series(&mut xml, i, series);
                write_refs(&mut xml, "c:cat", "c:strRef", "c:val", series, data_sheet);
                xml.push_str("</c:ser>\n");
            }
            xml.push_str("<c:firstSliceAng val=\"0\"/>\n</c:pieChart>\n");
        }
        ChartKind::Scatter(marker) => {
            xml.push_str("<c:scatterChart>\n");
            xml.push_str("<c:scatterStyle val=\"lineMarker\"/>\n<c:varyColors val=\"0\"/>\n");
            for (i, series) in chart.series.iter().enumerate() {
                open_series(&mut xml, i, series);
                xml.push_str("<c:spPr><a:ln w=\"19050\"><a:noFill/></a:ln></c:spPr>\n");
                write_marker(&mut xml, marker);
                write_refs(&mut xml, "c:xVal", "c:numRef", "c:yVal", series, data_sheet);
                xml.push_str("<c:smooth val=\"0\"/>\n</c:ser>\n");
            }
            write_ax_ids(&mut xml);
            xml.push_str("</c:scatterChart>\n");
            write_val_ax(&mut xml, CAT_AX_ID, VAL_AX_ID, "b", "midCat");
            write_val_ax(&mut xml, VAL_AX_ID, CAT_AX_ID, "l", "midCat");
        }
    }
    xml.push_str("</c:plotArea>\n");

    xml.push_str("<c:legend><c:legendPos val=\"r\"/><c:overlay val=\"0\"/></c:legend>\n");
    xml.push_str("<c:plotVisOnly val=\"1\"/>\n<c:dispBlanksAs val=\"gap\"/>\n");
    xml.push_str("</c:chart>\n</c:chartSpace>");
    xml
}

fn write_bar_plot(xml: &mut String, chart: &Chart, direction: BarDirection, data_sheet: &str) {
    xml.push_str("<c:barChart>\n");
    xml.push_str(&format!("<c:barDir val=\"{}\"/>\n", direction.as_xlsx()));
    xml.push_str("<c:grouping val=\"clustered\"/>\n<c:varyColors val=\"0\"/>\n");
    for (i, series) in chart.series.iter().enumerate() {
        open_series(xml, i, series);
        xml.push_str("<c:invertIfNegative val=\"0\"/>\n");
        write_refs(xml, "c:cat", "c:strRef", "c:val", series, data_sheet);
        xml.push_str("</c:ser>\n");
    }
    xml.push_str("<c:gapWidth val=\"150\"/>\n");
    write_ax_ids(xml);
    xml.push_str("</c:barChart>\n");

    let (cat_pos, val_pos) = match direction {
        BarDirection::Column => ("b", "l"),
        BarDirection::Bar => ("l", "b"),
    };
    write_cat_ax(xml, cat_pos);
    write_val_ax(xml, VAL_AX_ID, CAT_AX_ID, val_pos, "between");
}

fn open_series(xml: &mut String, index: usize, series: &Series) {
    xml.push_str(&format!(
        "<c:ser>\n<c:idx val=\"{i}\"/>\n<c:order val=\"{i}\"/>\n",
        i = index
    ));
    if let Some(name) = &series.name {
        xml.push_str(&format!("<c:tx><c:v>{}</c:v></c:tx>\n", escape_text(name)));
    }
}

fn write_marker(xml: &mut String, marker: MarkerStyle) {
    xml.push_str(&format!(
        "<c:marker><c:symbol val=\"{}\"/></c:marker>\n",
        marker.as_xlsx()
    ));
}

/// Category (or X) and value (or Y) references of a series
fn write_refs(
    xml: &mut String,
    cat_tag: &str,
    cat_ref: &str,
    val_tag: &str,
    series: &Series,
    data_sheet: &str,
) {
    xml.push_str(&format!(
        "<{cat_tag}><{cat_ref}><c:f>{}</c:f></{cat_ref}></{cat_tag}>\n",
        escape_text(&sheet_reference(data_sheet, &series.categories))
    ));
    xml.push_str(&format!(
        "<{val_tag}><c:numRef><c:f>{}</c:f></c:numRef></{val_tag}>\n",
        escape_text(&sheet_reference(data_sheet, &series.values))
    ));
}

fn write_ax_ids(xml: &mut String) {
    xml.push_str(&format!(
        "<c:axId val=\"{}\"/>\n<c:axId val=\"{}\"/>\n",
        CAT_AX_ID, VAL_AX_ID
    ));
}

fn write_cat_ax(xml: &mut String, pos: &str) {
    xml.push_str("<c:catAx>\n");
    xml.push_str(&format!("<c:axId val=\"{}\"/>\n", CAT_AX_ID));
    xml.push_str("<c:scaling><c:orientation val=\"minMax\"/></c:scaling>\n");
    xml.push_str("<c:delete val=\"0\"/>\n");
    xml.push_str(&format!("<c:axPos val=\"{}\"/>\n", pos));
    xml.push_str("<c:numFmt formatCode=\"General\" sourceLinked=\"1\"/>\n");
    xml.push_str("<c:tickLblPos val=\"nextTo\"/>\n");
    xml.push_str(&format!("<c:crossAx val=\"{}\"/>\n", VAL_AX_ID));
    xml.push_str("<c:crosses val=\"autoZero\"/>\n");
    xml.push_str("<c:auto val=\"1\"/>\n<c:lblAlgn val=\"ctr\"/>\n<c:lblOffset val=\"100\"/>\n");
    xml.push_str("</c:catAx>\n");
}

fn write_val_ax(xml: &mut String, id: u32, cross: u32, pos: &str, cross_between: &str) {
    xml.push_str("<c:valAx>\n");
    xml.push_str(&format!("<c:axId val=\"{}\"/>\n", id));
    xml.push_str("<c:scaling><c:orientation val=\"minMax\"/></c:scaling>\n");
    xml.push_str("<c:delete val=\"0\"/>\n");
    xml.push_str(&format!("<c:axPos val=\"{}\"/>\n", pos));
    if pos == "l" {
        xml.push_str("<c:majorGridlines/>\n");
    }
    xml.push_str("<c:numFmt formatCode=\"General\" sourceLinked=\"1\"/>\n");
    xml.push_str("<c:tickLblPos val=\"nextTo\"/>\n");
    xml.push_str(&format!("<c:crossAx val=\"{}\"/>\n", cross));
    xml.push_str("<c:crosses val=\"autoZero\"/>\n");
    xml.push_str(&format!("<c:crossBetween val=\"{}\"/>\n", cross_between));
    xml.push_str("</c:valAx>\n");
}

/// Drawing part anchoring `charts`; chart `i` is referenced as `rId{i+1}`
pub(crate) fn drawing_xml(charts: &[Chart]) -> String {
    let mut xml = String::with_capacity(512 + charts.len() * 900);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str("<xdr:wsDr xmlns:xdr=\"http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing\" ");
    xml.push_str("xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\n");

    for (idx, chart) in charts.iter().enumerate() {
        let chart_id = idx + 1;
        let from = chart.position.from();
        let to = chart.position.to();

        xml.push_str("<xdr:twoCellAnchor>\n");
        xml.push_str(&marker("from", from.col as u32, from.row));
        // The anchor rectangle is inclusive; the `to` marker sits one past it
        xml.push_str(&marker("to", to.col as u32 + 1, to.row + 1));

        xml.push_str("<xdr:graphicFrame macro=\"\">\n");
        xml.push_str("<xdr:nvGraphicFramePr>\n");
        xml.push_str(&format!(
            "<xdr:cNvPr id=\"{}\" name=\"Chart {}\"/>\n",
            chart_id + 1,
            chart_id
        ));
        xml.push_str("<xdr:cNvGraphicFramePr/>\n");
        xml.push_str("</xdr:nvGraphicFramePr>\n");
        xml.push_str("<xdr:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/></xdr:xfrm>\n");
        xml.push_str("<a:graphic>\n");
        xml.push_str("<a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/chart\">\n");
        xml.push_str(&format!(
            "<c:chart xmlns:c=\"http://schemas.openxmlformats.org/drawingml/2006/chart\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" r:id=\"rId{}\"/>\n",
            chart_id
        ));
        xml.push_str("</a:graphicData>\n");
        xml.push_str("</a:graphic>\n");
        xml.push_str("</xdr:graphicFrame>\n");
        xml.push_str("<xdr:clientData/>\n");
        xml.push_str("</xdr:twoCellAnchor>\n");
    }

    xml.push_str("</xdr:wsDr>");
    xml
}

fn marker(tag: &str, col: u32, row: u32) -> String {
    format!(
        "<xdr:{tag}><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:{tag}>\n",
        col, row
    )
}

/// Relationships from a drawing to its charts, numbered globally
pub(crate) fn drawing_rels_xml(chart_numbers: &[usize]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, n) in chart_numbers.iter().enumerate() {
        xml.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart{}.xml"/>"#,
            i + 1,
            n
        ));
    }
    xml.push_str("\n</Relationships>");
    xml
}
