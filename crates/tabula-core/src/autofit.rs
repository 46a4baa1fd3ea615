//! Column auto-fit
//!
//! Column widths in the file format are measured in "characters": multiples
//! of the maximum digit width of the default font (7px, i.e. 5.25pt, for
//! 11pt Calibri at 96 dpi). Auto-fit measures each cell's rendered text in
//! points through a [`FontMetrics`] provider, converts it to that unit, and
//! scales by a calibration factor that absorbs the gap between the fonts
//! available here and the fonts the file will be opened with.
//!
//! Two providers exist:
//! - [`HeuristicMetrics`]: a built-in advance table shaped like Calibri. Always available.
//! - `SystemFontMetrics` (feature `fonts`): real glyph advances from installed
//!   fonts via `font-kit`. When a family is missing the system substitutes
//!   one, and whatever resolves is what gets measured.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::cell::CellValue;
use crate::style::Style;
use crate::worksheet::Worksheet;

/// Calibration factor used when a sheet does not specify one
pub const DEFAULT_CALIBRATION_FACTOR: f64 = 1.0;

/// Characters added to the widest measured cell of a column
pub const AUTO_FIT_PADDING: f64 = 1.0;

/// Widest column the format allows, in characters
pub const MAX_COLUMN_WIDTH: f64 = 255.0;

/// Narrowest column width, in characters
pub const MIN_COLUMN_WIDTH: f64 = 0.0;

/// Width of one column-width unit in points
pub const DIGIT_WIDTH_PT: f64 = 5.25;

/// Text measurement provider
pub trait FontMetrics {
    /// Width in points of `text` set in `family` at `size_pt`.
    ///
    /// Multi-line text measures as its widest line.
    fn text_width(&self, family: &str, size_pt: f64, bold: bool, text: &str) -> f64;
}

impl<M: FontMetrics + ?Sized> FontMetrics for Box<M> {
    fn text_width(&self, family: &str, size_pt: f64, bold: bool, text: &str) -> f64 {
        (**self).text_width(family, size_pt, bold, text)
    }
}

/// Advance-table measurement that needs no installed fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMetrics;

impl HeuristicMetrics {
    /// Advance of one character in em units
    fn advance_em(c: char) -> f64 {
        match c {
            c if c.is_control() => 0.0,
            ' ' => 0.226,
            'i' | 'j' | 'l' | 'I' | '\'' | '|' | '!' | '.' | ',' | ':' | ';' => 0.25,
            'f' | 'r' | 't' | '(' | ')' | '[' | ']' | '-' => 0.33,
            '0'..='9' => 0.507,
            'm' | 'w' => 0.8,
            'M' | 'W' | '@' | '%' => 0.86,
            'a'..='z' => 0.49,
            'A'..='Z' => 0.6,
            c if is_wide(c) => 1.0,
            _ => 0.55,
        }
    }
}

impl FontMetrics for HeuristicMetrics {
    fn text_width(&self, _family: &str, size_pt: f64, bold: bool, text: &str) -> f64 {
        let weight = if bold { 1.06 } else { 1.0 };
        widest_line(text, |line| {
            line.chars().map(Self::advance_em).sum::<f64>() * size_pt * weight
        })
    }
}

/// East Asian wide and fullwidth ranges
fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

fn widest_line(text: &str, measure: impl Fn(&str) -> f64) -> f64 {
    text.lines().map(measure).fold(0.0, f64::max)
}

#[cfg(feature = "fonts")]
pub use system::SystemFontMetrics;

#[cfg(feature = "fonts")]
mod system {
    use std::cell::RefCell;

    use ahash::AHashMap;
    use font_kit::family_name::FamilyName;
    use font_kit::font::Font;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    use super::{widest_line, FontMetrics, HeuristicMetrics};

    /// Glyph advances from installed system fonts.
    ///
    /// Loaded fonts are cached per (family, bold). Not `Sync`; build one per
    /// thread if measuring in parallel.
    pub struct SystemFontMetrics {
        source: SystemSource,
        cache: RefCell<AHashMap<(String, bool), Option<Font>>>,
    }

    impl SystemFontMetrics {
        pub fn new() -> Self {
            Self {
                source: SystemSource::new(),
                cache: RefCell::new(AHashMap::new()),
            }
        }

        fn load(&self, family: &str, bold: bool) -> Option<Font> {
            let mut props = Properties::new();
            if bold {
                props.weight(Weight::BOLD);
            }

            let requested = [FamilyName::Title(family.to_string()), FamilyName::SansSerif];
            let handle = self.source.select_best_match(&requested, &props).ok()?;
            let font = handle.load().ok()?;
            if !font.family_name().eq_ignore_ascii_case(family) {
                log::debug!(
                    "font '{}' not installed, measuring with '{}'",
                    family,
                    font.family_name()
                );
            }
            Some(font)
        }

        fn measure_line(font: &Font, size_pt: f64, line: &str) -> f64 {
            let units_per_em = font.metrics().units_per_em as f64;
            if units_per_em <= 0.0 {
                return 0.0;
            }
            let units: f64 = line
                .chars()
                .filter_map(|c| font.glyph_for_char(c))
                .filter_map(|glyph| font.advance(glyph).ok())
                .map(|advance| advance.x().max(0.0) as f64)
                .sum();
            units / units_per_em * size_pt
        }
    }

    impl Default for SystemFontMetrics {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FontMetrics for SystemFontMetrics {
        fn text_width(&self, family: &str, size_pt: f64, bold: bool, text: &str) -> f64 {
            let mut cache = self.cache.borrow_mut();
            let font = cache
                .entry((family.to_string(), bold))
                .or_insert_with(|| self.load(family, bold));

            match font {
                Some(font) => widest_line(text, |line| Self::measure_line(font, size_pt, line)),
                None => {
                    log::debug!("no system font resolved for '{}', using built-in table", family);
                    HeuristicMetrics.text_width(family, size_pt, bold, text)
                }
            }
        }
    }
}

/// The provider auto-fit uses when none is configured
pub fn default_metrics() -> Box<dyn FontMetrics> {
    #[cfg(feature = "fonts")]
    {
        Box::new(SystemFontMetrics::new())
    }
    #[cfg(not(feature = "fonts"))]
    {
        Box::new(HeuristicMetrics)
    }
}

/// Rendered width of `text` in points using the default provider
pub fn estimate_text_width(font_family: &str, font_size_pt: f64, text: &str) -> f64 {
    default_metrics().text_width(font_family, font_size_pt, false, text)
}

/// Convert a width in points into column-width characters
pub fn to_column_width_units(width_pt: f64, calibration_factor: f64) -> f64 {
    width_pt * calibration_factor / DIGIT_WIDTH_PT
}

/// Text a cell shows, as far as width is concerned.
///
/// Formulas have no cached result and contribute nothing.
pub fn display_text(value: &CellValue) -> Cow<'_, str> {
    match value {
        CellValue::Text(s) => Cow::Borrowed(s.as_str()),
        CellValue::Formula(_) | CellValue::Empty => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

/// Estimated widths for every populated column of `sheet` that has no
/// explicit width.
///
/// Cells that anchor a merge spanning several columns are skipped, as the
/// merged area carries their text. Columns where nothing measures wider than
/// zero are left out and keep the default width.
pub fn auto_fit_columns(
    sheet: &Worksheet,
    default_style: &Style,
    metrics: &dyn FontMetrics,
    calibration_factor: f64,
) -> BTreeMap<u16, f64> {
    let mut widest: BTreeMap<u16, f64> = BTreeMap::new();

    for (addr, cell) in sheet.cells() {
        if sheet.column_width(addr.col).is_some() {
            continue;
        }
        let spans_columns = sheet
            .merges()
            .iter()
            .any(|m| m.col_count() > 1 && m.contains(&addr));
        if spans_columns {
            continue;
        }

        let font = &cell.effective_style(default_style).font;
        let text = display_text(&cell.value);
        let width_pt = metrics.text_width(&font.family, font.size, font.bold, &text);
        let units = to_column_width_units(width_pt, calibration_factor);

        let slot = widest.entry(addr.col).or_insert(0.0);
        *slot = slot.max(units);
    }

    widest.retain(|_, width| *width > 0.0);
    for width in widest.values_mut() {
        *width = (*width + AUTO_FIT_PADDING).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
    }
    widest
}
