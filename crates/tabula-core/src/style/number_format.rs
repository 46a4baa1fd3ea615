//! Number format codes
//!
//! Styles carry a format code string such as `"$#,##0.00"`. Codes that match
//! a built-in format are written with its reserved id; everything else gets a
//! custom id starting at [`FIRST_CUSTOM_ID`].

use ahash::AHashMap;
use once_cell::sync::Lazy;

/// The default code
pub const GENERAL: &str = "General";

/// Code applied to date cells whose style has no date format of its own
pub const DEFAULT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";

/// First id available to custom format codes
pub const FIRST_CUSTOM_ID: u32 = 164;

const BUILTIN: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

static BUILTIN_IDS: Lazy<AHashMap<&'static str, u32>> =
    Lazy::new(|| BUILTIN.iter().map(|(id, code)| (*code, *id)).collect());

/// Built-in id for a format code, if it has one
pub fn builtin_id(code: &str) -> Option<u32> {
    BUILTIN_IDS.get(code).copied()
}

/// Format code for a built-in id
pub fn builtin_code(id: u32) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, code)| *code)
}

/// Whether a format code renders a date or time.
///
/// Quoted literals, escaped characters and bracketed modifiers such as
/// `[Red]` are ignored; elapsed-time brackets (`[h]`, `[mm]`) count.
pub fn is_date_format(code: &str) -> bool {
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&b| b != ']').collect();
                let lower = inner.to_ascii_lowercase();
                if !lower.is_empty() && lower.chars().all(|b| matches!(b, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M' => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin_id("General"), Some(0));
        assert_eq!(builtin_id("0.00%"), Some(10));
        assert_eq!(builtin_id("$#,##0.00"), None);
        assert_eq!(builtin_code(14), Some("mm-dd-yy"));
        assert_eq!(builtin_code(164), None);
    }

    #[test]
    fn test_is_date_format() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format(DEFAULT_DATETIME));
        assert!(is_date_format("[h]:mm:ss"));
        assert!(is_date_format("m/d/yy h:mm"));
        assert!(!is_date_format("General"));
        assert!(!is_date_format("$#,##0.00"));
        assert!(!is_date_format("#,##0.00;[Red](#,##0.00)"));
        assert!(!is_date_format("0.00\" days\""));
        assert!(!is_date_format("0.00E+00"));
        assert!(!is_date_format("@"));
    }
}
