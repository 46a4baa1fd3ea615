//! Shared string table (xl/sharedStrings.xml)

use ahash::AHashMap;

use crate::xml::text_element;

/// Deduplicated text values in first-seen order
#[derive(Debug, Default)]
pub(crate) struct SharedStrings<'a> {
    strings: Vec<&'a str>,
    index: AHashMap<&'a str, u32>,
    references: usize,
}

impl<'a> SharedStrings<'a> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Index of `s`, adding it on first use
    pub(crate) fn add(&mut self, s: &'a str) -> u32 {
        self.references += 1;
        if let Some(&idx) = self.index.get(s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(s);
        self.index.insert(s, idx);
        idx
    }

    pub(crate) fn len(&self) -> usize {
        self.strings.len()
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.strings.len() * 24);
        xml.push_str(&format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.references,
            self.strings.len()
        ));
        for s in &self.strings {
            xml.push_str("<si>");
            xml.push_str(&text_element(s));
            xml.push_str("</si>");
        }
        xml.push_str("</sst>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut sst = SharedStrings::new();
        assert_eq!(sst.add("b"), 0);
        assert_eq!(sst.add("a"), 1);
        assert_eq!(sst.add("b"), 0);
        assert_eq!(sst.len(), 2);

        let xml = sst.to_xml();
        assert!(xml.contains("count=\"3\" uniqueCount=\"2\""));
        assert!(xml.find("<t>b</t>").unwrap() < xml.find("<t>a</t>").unwrap());
    }

    #[test]
    fn test_preserved_whitespace() {
        let mut sst = SharedStrings::new();
        sst.add("  padded ");
        assert!(sst
            .to_xml()
            .contains("<si><t xml:space=\"preserve\">  padded </t></si>"));
    }
}
