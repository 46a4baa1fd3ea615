//! Cell styling types
//!
//! This module contains types for cell formatting:
//! - [`Style`] - Complete cell style
//! - [`FontStyle`] - Font settings
//! - [`BorderStyle`] - Cell borders
//! - [`Alignment`] - Text alignment
//! - [`Color`] - Color representation
//! - [`StyleRegistry`] - Save-scoped style interning
//!
//! Styles are values. Every builder method consumes the style and returns a
//! modified copy, so a style shared by many cells is never changed under them.

mod alignment;
mod border;
mod color;
mod font;
pub mod number_format;
mod registry;

pub use alignment::{Alignment, HorizontalAlignment, VerticalAlignment};
pub use border::{BorderEdge, BorderLineStyle, BorderStyle};
pub use color::Color;
pub use font::FontStyle;
pub use registry::{StyleId, StyleRegistry};

/// Complete cell style
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Style {
    /// Font settings
    pub font: FontStyle,
    /// Solid background color, if any
    pub fill: Option<Color>,
    /// Border settings
    pub border: BorderStyle,
    /// Text alignment
    pub alignment: Alignment,
    /// Number format code (e.g. `"$#,##0.00"`)
    pub number_format: String,
    /// Link attached to the cell
    pub hyperlink: Option<Hyperlink>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: FontStyle::default(),
            fill: None,
            border: BorderStyle::default(),
            alignment: Alignment::default(),
            number_format: number_format::GENERAL.to_string(),
            hyperlink: None,
        }
    }
}

impl Style {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font to bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    /// Set font to italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Set font size in points
    pub fn font_size(mut self, size: f64) -> Self {
        self.font.size = size;
        self
    }

    /// Set font family
    pub fn font_family<S: Into<String>>(mut self, family: S) -> Self {
        self.font.family = family.into();
        self
    }

    /// Set font color
    pub fn font_color(mut self, color: Color) -> Self {
        self.font.color = color;
        self
    }

    /// Replace the whole font
    pub fn font(mut self, font: FontStyle) -> Self {
        self.font = font;
        self
    }

    /// Set fill color (solid fill)
    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    /// Remove the fill
    pub fn no_fill(mut self) -> Self {
        self.fill = None;
        self
    }

    /// Replace all borders
    pub fn border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    /// Set number format code
    pub fn number_format<S: Into<String>>(mut self, format: S) -> Self {
        self.number_format = format.into();
        self
    }

    /// Set horizontal alignment
    pub fn horizontal_alignment(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = align;
        self
    }

    /// Set vertical alignment
    pub fn vertical_alignment(mut self, align: VerticalAlignment) -> Self {
        self.alignment.vertical = align;
        self
    }

    /// Enable text wrapping
    pub fn wrap_text(mut self, wrap: bool) -> Self {
        self.alignment.wrap_text = wrap;
        self
    }

    /// Attach a hyperlink
    pub fn hyperlink(mut self, link: Hyperlink) -> Self {
        self.hyperlink = Some(link);
        self
    }

    /// Whether the number format renders dates
    pub fn is_date_format(&self) -> bool {
        number_format::is_date_format(&self.number_format)
    }

    /// The cell-format portion of this style (everything except the hyperlink)
    pub fn format_only(&self) -> Style {
        Style {
            hyperlink: None,
            ..self.clone()
        }
    }
}

/// External link shown on a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hyperlink {
    /// Target URL
    pub url: String,
    /// Text shown in the tooltip/display slot
    pub display: Option<String>,
}

impl Hyperlink {
    /// Link without display text
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            display: None,
        }
    }

    /// Set the display text
    pub fn with_display<S: Into<String>>(mut self, display: S) -> Self {
        self.display = Some(display.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_with_leaves_original() {
        let base = Style::new().font_size(12.0);
        let bold = base.clone().bold(true);
        assert!(!base.font.bold);
        assert!(bold.font.bold);
        assert_eq!(bold.font.size, 12.0);
    }

    #[test]
    fn test_format_only_strips_link() {
        let linked = Style::new().bold(true).hyperlink(Hyperlink::new("https://example.com"));
        assert_eq!(linked.format_only(), Style::new().bold(true));
    }
}
