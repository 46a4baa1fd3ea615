//! Cell value types

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value, possibly styled)
    #[default]
    Empty,

    /// Text value, stored through the shared string table
    Text(String),

    /// Whole number
    Integer(i64),

    /// Floating point number
    Number(f64),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Date and time, serialized as a 1900-system serial number
    DateTime(NaiveDateTime),

    /// Formula text including the leading `=`. Never evaluated.
    Formula(String),
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create a formula value, adding the leading `=` when missing
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        if text.starts_with('=') {
            CellValue::Formula(text)
        } else {
            CellValue::Formula(format!("={}", text))
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula(_))
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Number(n) => Some(*n),
            CellValue::DateTime(dt) => Some(datetime_to_serial(dt)),
            _ => None,
        }
    }

    /// Try to get the value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula(text) => Some(text),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Text(_) => "text",
            CellValue::Integer(_) => "integer",
            CellValue::Number(_) => "number",
            CellValue::Boolean(_) => "boolean",
            CellValue::DateTime(_) => "datetime",
            CellValue::Formula(_) => "formula",
        }
    }

    /// Same value with formula text normalized to a leading `=`
    pub(crate) fn normalized(self) -> Self {
        match self {
            CellValue::Formula(text) => CellValue::formula(text),
            other => other,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            CellValue::Formula(text) => f.write_str(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Integer(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Integer(n as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::DateTime(d.and_time(chrono::NaiveTime::MIN))
    }
}

/// Day zero of the 1900 date system as spreadsheet applications count it
/// (1899-12-30, which absorbs the phantom 1900-02-29).
fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or(NaiveDate::MIN)
        .and_time(chrono::NaiveTime::MIN)
}

/// Convert a datetime into a fractional day serial number
pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let millis = dt.signed_duration_since(serial_epoch()).num_milliseconds();
    millis as f64 / MILLIS_PER_DAY
}

/// Convert a serial number back into a datetime, rounded to the millisecond
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let millis = (serial * MILLIS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    serial_epoch().checked_add_signed(Duration::milliseconds(millis as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_formula_normalization() {
        assert_eq!(
            CellValue::formula("SUM(A1:A3)"),
            CellValue::Formula("=SUM(A1:A3)".into())
        );
        assert_eq!(
            CellValue::formula("=A1*2"),
            CellValue::Formula("=A1*2".into())
        );
        assert_eq!(
            CellValue::Formula("B2".into()).normalized(),
            CellValue::Formula("=B2".into())
        );
    }

    #[test]
    fn test_serial_known_dates() {
        assert_eq!(datetime_to_serial(&dt(1900, 3, 1, 0, 0, 0)), 61.0);
        assert_eq!(datetime_to_serial(&dt(2024, 1, 1, 0, 0, 0)), 45292.0);
        assert_eq!(datetime_to_serial(&dt(2024, 1, 1, 12, 0, 0)), 45292.5);
    }

    #[test]
    fn test_serial_roundtrip() {
        let original = dt(2023, 7, 14, 9, 41, 17);
        let serial = datetime_to_serial(&original);
        assert_eq!(serial_to_datetime(serial), Some(original));
        assert_eq!(serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::from(true).to_string(), "TRUE");
        assert_eq!(CellValue::from(42).to_string(), "42");
        assert_eq!(
            CellValue::from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).to_string(),
            "2024-02-29"
        );
    }
}
