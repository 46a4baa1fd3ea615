//! XML text helpers shared by the writer and reader

use std::borrow::Cow;
use std::str::FromStr;

use quick_xml::escape::escape;
use quick_xml::events::BytesStart;

/// Escape text content
pub(crate) fn escape_text(s: &str) -> Cow<'_, str> {
    escape(s)
}

/// Escape an attribute value, keeping line breaks and tabs intact
pub(crate) fn escape_attr(s: &str) -> String {
    let escaped = escape(s);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped.into_owned();
    }
    escaped
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

/// Encode a cell string for a `<t>` element.
///
/// Characters XML 1.0 cannot carry are written as `_xHHHH_`. A literal
/// underscore that would otherwise read back as an escape is written as
/// `_x005F_`.
pub(crate) fn encode_cell_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '_' if looks_like_escape(&s[i..]) => out.push_str("_x005F_"),
            '\t' | '\n' => out.push(c),
            c if c.is_control() && (c as u32) < 0x20 => {
                out.push_str(&format!("_x{:04X}_", c as u32));
            }
            c => out.push(c),
        }
    }
    escape(&out).into_owned()
}

fn looks_like_escape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 7
        && b[0] == b'_'
        && (b[1] == b'x' || b[1] == b'X')
        && b[2..6].iter().all(u8::is_ascii_hexdigit)
        && b[6] == b'_'
}

/// Whether a `<t>` element needs `xml:space="preserve"`
pub(crate) fn needs_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

/// `<t>` element for a cell string
pub(crate) fn text_element(s: &str) -> String {
    let space = if needs_preserve(s) {
        " xml:space=\"preserve\""
    } else {
        ""
    };
    format!("<t{}>{}</t>", space, encode_cell_text(s))
}

/// Decode `_xHHHH_` escape sequences in strings.
///
/// - `_x000D_` = CR (carriage return)
/// - `_x000A_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005F_` = Underscore (escaped underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") && !s.contains("_X") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('_') {
        result.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if looks_like_escape(rest) {
            let decoded = u32::from_str_radix(&rest[2..6], 16)
                .ok()
                .and_then(char::from_u32);
            if let Some(c) = decoded {
                result.push(c);
                rest = &rest[7..];
                continue;
            }
        }

        result.push('_');
        rest = &rest[1..];
    }

    result.push_str(rest);
    result
}

/// Unescaped value of an attribute
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Attribute parsed into `T`
pub(crate) fn attr_parse<T: FromStr>(e: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

/// Boolean attribute (`1` / `true`)
pub(crate) fn attr_bool(e: &BytesStart<'_>, key: &[u8]) -> Option<bool> {
    attr(e, key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Value of an `r:id`-style attribute, whatever prefix the namespace uses
pub(crate) fn relationship_id(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id")
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Resolve a relationship target against the folder of its source part
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for piece in target.split('/') {
        match piece {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Relationships part that belongs to `part`
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_excel_escapes_carriage_return() {
        assert_eq!(decode_excel_escapes("a_x000D_b"), "a\rb");
    }

    #[test]
    fn test_decode_excel_escapes_lowercase() {
        assert_eq!(decode_excel_escapes("a_x000d__x000a_b"), "a\r\nb");
    }

    #[test]
    fn test_decode_excel_escapes_underscore() {
        assert_eq!(decode_excel_escapes("_x005F_x0041_"), "_x0041_");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("snake_case_x12"), "snake_case_x12");
        assert_eq!(decode_excel_escapes("_x00G1_"), "_x00G1_");
    }

    #[test]
    fn test_encode_then_decode_specials() {
        for s in ["tab\there", "bell\u{7}", "_x0041_", "plain_text", "a < b & c"] {
            let encoded = encode_cell_text(s);
            let unescaped = quick_xml::escape::unescape(&encoded).unwrap();
            assert_eq!(decode_excel_escapes(&unescaped), s);
        }
    }

    #[test]
    fn test_escape_attr_line_breaks() {
        assert_eq!(escape_attr("a\n\"b\""), "a&#10;&quot;b&quot;");
    }

    #[test]
    fn test_text_element_preserve() {
        assert_eq!(text_element("x"), "<t>x</t>");
        assert_eq!(text_element(" x"), "<t xml:space=\"preserve\"> x</t>");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/drawings/drawing1.xml", "../charts/chart1.xml"),
            "xl/charts/chart1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/styles.xml"),
            "xl/styles.xml"
        );
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(
            rels_path("xl/worksheets/sheet2.xml"),
            "xl/worksheets/_rels/sheet2.xml.rels"
        );
    }
}
