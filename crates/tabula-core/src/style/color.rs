//! Color representation

use std::fmt;
use std::hash::{Hash, Hasher};

/// Color used by fonts, fills and borders
#[derive(Debug, Clone, Copy, Default)]
pub enum Color {
    /// Automatic/default color
    #[default]
    Auto,

    /// Opaque RGB color
    Rgb { r: u8, g: u8, b: u8 },

    /// Theme color with optional tint
    ///
    /// Theme indices:
    /// 0 = Background 1 (light)
    /// 1 = Text 1 (dark)
    /// 2 = Background 2
    /// 3 = Text 2
    /// 4-9 = Accent 1-6
    Theme {
        /// Theme color index (0-9)
        index: u8,
        /// Tint from -1.0 (darken) to 1.0 (lighten), kept at full precision
        tint: f64,
    },

    /// Indexed color (legacy palette)
    Indexed(u8),
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const LIGHT_GRAY: Color = Color::rgb(217, 217, 217);

    /// Create an RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Create a theme color
    pub const fn theme(index: u8, tint: f64) -> Self {
        Color::Theme { index, tint }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or `AARRGGBB` (alpha is discarded)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let rgb = match hex.len() {
            6 => hex,
            8 => hex.get(2..)?,
            _ => return None,
        };

        let r = u8::from_str_radix(rgb.get(0..2)?, 16).ok()?;
        let g = u8::from_str_radix(rgb.get(2..4)?, 16).ok()?;
        let b = u8::from_str_radix(rgb.get(4..6)?, 16).ok()?;
        Some(Color::Rgb { r, g, b })
    }

    /// ARGB hex string as stored in the container (`FFRRGGBB`), for RGB colors only
    pub fn to_argb_hex(&self) -> Option<String> {
        match self {
            Color::Rgb { r, g, b } => Some(format!("FF{:02X}{:02X}{:02X}", r, g, b)),
            _ => None,
        }
    }

    /// Is this the automatic color
    pub fn is_auto(&self) -> bool {
        matches!(self, Color::Auto)
    }
}

/// Bit pattern used for equality and hashing; `-0.0` and `0.0` are one tint
fn tint_bits(tint: f64) -> u64 {
    if tint == 0.0 {
        0
    } else {
        tint.to_bits()
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Color::Auto, Color::Auto) => true,
            (Color::Rgb { r, g, b }, Color::Rgb { r: r2, g: g2, b: b2 }) => {
                (r, g, b) == (r2, g2, b2)
            }
            (Color::Theme { index, tint }, Color::Theme { index: i2, tint: t2 }) => {
                index == i2 && tint_bits(*tint) == tint_bits(*t2)
            }
            (Color::Indexed(a), Color::Indexed(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Color::Auto => {}
            Color::Rgb { r, g, b } => (r, g, b).hash(state),
            Color::Theme { index, tint } => {
                index.hash(state);
                tint_bits(*tint).hash(state);
            }
            Color::Indexed(i) => i.hash(state),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => f.write_str("auto"),
            Color::Rgb { r, g, b } => write!(f, "#{:02X}{:02X}{:02X}", r, g, b),
            Color::Theme { index, tint } => write!(f, "theme({}, {})", index, tint),
            Color::Indexed(i) => write!(f, "indexed({})", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::RED));
        assert_eq!(Color::from_hex("80FFFF00"), Some(Color::YELLOW));
        assert_eq!(Color::from_hex("FFF"), None);
        assert_eq!(Color::from_hex("GG0000"), None);
        assert_eq!(Color::from_hex("Aé12345"), None);
        assert_eq!(Color::from_hex("FFFFé"), None);
    }

    #[test]
    fn test_theme_tint_keeps_precision() {
        let tint = -0.249977111117893;
        assert_eq!(Color::theme(3, tint), Color::theme(3, tint));
        assert_ne!(Color::theme(3, tint), Color::theme(3, -0.25));
        assert_eq!(Color::theme(1, -0.0), Color::theme(1, 0.0));
    }

    #[test]
    fn test_to_argb_hex() {
        assert_eq!(Color::rgb(1, 2, 3).to_argb_hex().as_deref(), Some("FF010203"));
        assert_eq!(Color::Auto.to_argb_hex(), None);
    }
}
