//! Save-scoped style interning
//!
//! A registry is built fresh for every save. Cells reference formats by the
//! small integer id it hands out, so N cells sharing a style cost one entry.

use super::Style;
use ahash::AHashMap;

/// Index of an interned cell format; 0 is the workbook default
pub type StyleId = u32;

/// Deduplicating style index
///
/// Ids are assigned sequentially in first-seen order, so the same traversal
/// always yields the same table.
#[derive(Debug)]
pub struct StyleRegistry {
    /// All unique styles (index 0 is default)
    styles: Vec<Style>,
    /// Fast lookup for deduplication
    index_map: AHashMap<Style, StyleId>,
}

impl StyleRegistry {
    /// Create a registry whose id 0 is `default`
    pub fn new(default: &Style) -> Self {
        let default = default.format_only();
        let mut index_map = AHashMap::with_capacity(64);
        index_map.insert(default.clone(), 0);

        Self {
            styles: vec![default],
            index_map,
        }
    }

    /// Return the id for `style`, assigning the next id if it is new.
    ///
    /// Hyperlinks are not part of a cell format and are ignored here.
    pub fn intern(&mut self, style: &Style) -> StyleId {
        if style.hyperlink.is_none() {
            if let Some(&id) = self.index_map.get(style) {
                return id;
            }
            return self.insert(style.clone());
        }

        let format = style.format_only();
        match self.index_map.get(&format) {
            Some(&id) => id,
            None => self.insert(format),
        }
    }

    fn insert(&mut self, style: Style) -> StyleId {
        let id = self.styles.len() as StyleId;
        self.index_map.insert(style.clone(), id);
        self.styles.push(style);
        id
    }

    /// Get a style by id
    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id as usize)
    }

    /// Number of interned styles, default included
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Always false: the default is interned at construction
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Iterate over all styles with their ids, in id order
    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &Style)> {
        self.styles
            .iter()
            .enumerate()
            .map(|(i, s)| (i as StyleId, s))
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new(&Style::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, Hyperlink};

    #[test]
    fn test_default_style() {
        let registry = StyleRegistry::default();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0), Some(&Style::default()));
    }

    #[test]
    fn test_deduplication() {
        let mut registry = StyleRegistry::default();

        let id1 = registry.intern(&Style::new().bold(true));
        let id2 = registry.intern(&Style::new().bold(true));
        let id3 = registry.intern(&Style::new().italic(true));

        assert_eq!(id1, 1);
        assert_eq!(id1, id2);
        assert_eq!(id3, 2);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.intern(&Style::default()), 0);
    }

    #[test]
    fn test_sequential_ids_follow_first_use() {
        let styles = [
            Style::new().fill_color(Color::RED),
            Style::new().font_size(14.0),
            Style::new().fill_color(Color::RED),
            Style::new().number_format("0.00%"),
        ];

        let mut a = StyleRegistry::default();
        let mut b = StyleRegistry::default();
        let ids_a: Vec<_> = styles.iter().map(|s| a.intern(s)).collect();
        let ids_b: Vec<_> = styles.iter().map(|s| b.intern(s)).collect();

        assert_eq!(ids_a, vec![1, 2, 1, 3]);
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_hyperlink_does_not_split_formats() {
        let mut registry = StyleRegistry::default();
        let plain = Style::new().bold(true);
        let linked = plain.clone().hyperlink(Hyperlink::new("https://example.com"));

        assert_eq!(registry.intern(&plain), registry.intern(&linked));
        assert_eq!(registry.len(), 2);
    }
}
