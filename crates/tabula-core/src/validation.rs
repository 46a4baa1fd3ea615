//! Data validation
//!
//! Validation rules restrict what users can type into a range of cells.
//! Each rule family is one variant of [`ValidationRule`], with bounds typed
//! per family.
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CellRange, DataValidation, ValidationOperator, Workbook};
//!
//! let mut workbook = Workbook::new("Orders");
//! let sheet = workbook.add_worksheet("Sheet1").unwrap();
//!
//! let validation = DataValidation::whole_number(ValidationOperator::Between, 1, Some(100))
//!     .unwrap()
//!     .with_error_alert("Invalid quantity", "Enter a number from 1 to 100");
//!
//! sheet.add_validation(CellRange::parse("B2:B50").unwrap(), validation);
//! ```

use chrono::NaiveDate;

use crate::cell::{datetime_to_serial, serial_to_datetime};
use crate::error::{Error, Result};

/// A validation rule plus its prompt and alert settings
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidation {
    /// What the cell accepts
    pub rule: ValidationRule,
    /// Whether blank entries pass
    pub allow_blank: bool,
    /// Prompt shown when the cell is selected
    pub input_message: Option<ValidationMessage>,
    /// Alert shown on invalid entry
    pub error_alert: Option<ValidationMessage>,
    /// How strictly the alert blocks invalid entry
    pub error_style: ValidationErrorStyle,
}

impl DataValidation {
    /// Wrap a rule with default settings
    pub fn new(rule: ValidationRule) -> Self {
        Self {
            rule,
            allow_blank: true,
            input_message: None,
            error_alert: None,
            error_style: ValidationErrorStyle::Stop,
        }
    }

    /// Dropdown list of literal items
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ValidationRule::List(ListSource::Items(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// Dropdown list fed by a range formula such as `'Lists'!$A$1:$A$5`
    pub fn list_range(formula: impl Into<String>) -> Self {
        Self::new(ValidationRule::List(ListSource::Range(strip_equals(
            formula.into(),
        ))))
    }

    /// Whole-number comparison
    pub fn whole_number(
        operator: ValidationOperator,
        first: i64,
        second: Option<i64>,
    ) -> Result<Self> {
        Ok(Self::new(ValidationRule::WholeNumber(Criterion::new(
            operator, first, second,
        )?)))
    }

    /// Decimal comparison
    pub fn decimal(operator: ValidationOperator, first: f64, second: Option<f64>) -> Result<Self> {
        Ok(Self::new(ValidationRule::DecimalNumber(Criterion::new(
            operator, first, second,
        )?)))
    }

    /// Date comparison
    pub fn date(
        operator: ValidationOperator,
        first: NaiveDate,
        second: Option<NaiveDate>,
    ) -> Result<Self> {
        Ok(Self::new(ValidationRule::Date(Criterion::new(
            operator, first, second,
        )?)))
    }

    /// Text length comparison
    pub fn text_length(operator: ValidationOperator, first: u32, second: Option<u32>) -> Result<Self> {
        Ok(Self::new(ValidationRule::TextLength(Criterion::new(
            operator, first, second,
        )?)))
    }

    /// Custom formula that must evaluate to TRUE
    pub fn custom(formula: impl Into<String>) -> Self {
        Self::new(ValidationRule::Custom(strip_equals(formula.into())))
    }

    /// Set whether blanks are allowed
    pub fn with_allow_blank(mut self, allow: bool) -> Self {
        self.allow_blank = allow;
        self
    }

    /// Set the input prompt
    pub fn with_input_message(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.input_message = Some(ValidationMessage::new(title, body));
        self
    }

    /// Set the error alert
    pub fn with_error_alert(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.error_alert = Some(ValidationMessage::new(title, body));
        self
    }

    /// Set the error style
    pub fn with_error_style(mut self, style: ValidationErrorStyle) -> Self {
        self.error_style = style;
        self
    }
}

/// Title and body of a prompt or alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    pub title: String,
    pub body: String,
}

impl ValidationMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// The rule families
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRule {
    /// Value must be one of a list
    List(ListSource),
    /// Whole number compared against bounds
    WholeNumber(Criterion<i64>),
    /// Decimal compared against bounds
    DecimalNumber(Criterion<f64>),
    /// Date compared against bounds
    Date(Criterion<NaiveDate>),
    /// Text length compared against bounds
    TextLength(Criterion<u32>),
    /// Formula that must evaluate to TRUE (stored, never evaluated)
    Custom(String),
}

impl ValidationRule {
    /// Type name used in the sheet part
    pub fn xlsx_type(&self) -> &'static str {
        match self {
            ValidationRule::List(_) => "list",
            ValidationRule::WholeNumber(_) => "whole",
            ValidationRule::DecimalNumber(_) => "decimal",
            ValidationRule::Date(_) => "date",
            ValidationRule::TextLength(_) => "textLength",
            ValidationRule::Custom(_) => "custom",
        }
    }
}

/// Where list items come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    /// Literal items
    Items(Vec<String>),
    /// Range formula
    Range(String),
}

/// An operator with one or two typed bounds.
///
/// Between and NotBetween take two bounds, every other operator exactly one.
/// The constructor enforces this, so a `Criterion` always holds a valid pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion<T> {
    operator: ValidationOperator,
    first: T,
    second: Option<T>,
}

impl<T> Criterion<T> {
    /// Build a criterion, checking the bound count against the operator
    pub fn new(operator: ValidationOperator, first: T, second: Option<T>) -> Result<Self> {
        let expected = if operator.requires_two_values() { 2 } else { 1 };
        let supplied = 1 + second.is_some() as usize;
        if expected != supplied {
            return Err(Error::InvalidCriterion {
                operator: operator.xlsx_operator(),
                expected,
            });
        }
        Ok(Self {
            operator,
            first,
            second,
        })
    }

    pub fn operator(&self) -> ValidationOperator {
        self.operator
    }

    pub fn first(&self) -> &T {
        &self.first
    }

    pub fn second(&self) -> Option<&T> {
        self.second.as_ref()
    }
}

/// A bound type that can be written into, and read back from, a validation formula
pub trait BoundValue: Sized {
    fn to_formula(&self) -> String;
    fn from_formula(s: &str) -> Option<Self>;
}

impl BoundValue for i64 {
    fn to_formula(&self) -> String {
        self.to_string()
    }

    fn from_formula(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

impl BoundValue for u32 {
    fn to_formula(&self) -> String {
        self.to_string()
    }

    fn from_formula(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

impl BoundValue for f64 {
    fn to_formula(&self) -> String {
        self.to_string()
    }

    fn from_formula(s: &str) -> Option<Self> {
        s.trim().parse().ok().filter(|v: &f64| v.is_finite())
    }
}

impl BoundValue for NaiveDate {
    fn to_formula(&self) -> String {
        let serial = datetime_to_serial(&self.and_time(chrono::NaiveTime::MIN));
        format!("{}", serial as i64)
    }

    fn from_formula(s: &str) -> Option<Self> {
        let serial: f64 = s.trim().parse().ok()?;
        serial_to_datetime(serial).map(|dt| dt.date())
    }
}

/// Validation formulas are stored without a leading `=`
fn strip_equals(formula: String) -> String {
    match formula.strip_prefix('=') {
        Some(rest) => rest.to_string(),
        None => formula,
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationOperator {
    #[default]
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl ValidationOperator {
    pub fn xlsx_operator(&self) -> &'static str {
        match self {
            ValidationOperator::Between => "between",
            ValidationOperator::NotBetween => "notBetween",
            ValidationOperator::Equal => "equal",
            ValidationOperator::NotEqual => "notEqual",
            ValidationOperator::GreaterThan => "greaterThan",
            ValidationOperator::LessThan => "lessThan",
            ValidationOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            ValidationOperator::LessThanOrEqual => "lessThanOrEqual",
        }
    }

    pub fn from_xlsx(s: &str) -> Option<Self> {
        match s {
            "between" => Some(ValidationOperator::Between),
            "notBetween" => Some(ValidationOperator::NotBetween),
            "equal" => Some(ValidationOperator::Equal),
            "notEqual" => Some(ValidationOperator::NotEqual),
            "greaterThan" => Some(ValidationOperator::GreaterThan),
            "lessThan" => Some(ValidationOperator::LessThan),
            "greaterThanOrEqual" => Some(ValidationOperator::GreaterThanOrEqual),
            "lessThanOrEqual" => Some(ValidationOperator::LessThanOrEqual),
            _ => None,
        }
    }

    pub fn requires_two_values(&self) -> bool {
        matches!(
            self,
            ValidationOperator::Between | ValidationOperator::NotBetween
        )
    }
}

/// Error alert style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationErrorStyle {
    #[default]
    Stop,
    Warning,
    Information,
}

impl ValidationErrorStyle {
    pub fn xlsx_style(&self) -> &'static str {
        match self {
            ValidationErrorStyle::Stop => "stop",
            ValidationErrorStyle::Warning => "warning",
            ValidationErrorStyle::Information => "information",
        }
    }

    pub fn from_xlsx(s: &str) -> Option<Self> {
        match s {
            "stop" => Some(ValidationErrorStyle::Stop),
            "warning" => Some(ValidationErrorStyle::Warning),
            "information" => Some(ValidationErrorStyle::Information),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_validation() {
        let v = DataValidation::list(["Yes", "No", "Maybe"]);
        assert_eq!(
            v.rule,
            ValidationRule::List(ListSource::Items(vec![
                "Yes".into(),
                "No".into(),
                "Maybe".into()
            ]))
        );
        assert!(v.allow_blank);
    }

    #[test]
    fn test_between_requires_two_bounds() {
        let err = DataValidation::whole_number(ValidationOperator::Between, 1, None).unwrap_err();
        assert!(matches!(err, Error::InvalidCriterion { expected: 2, .. }));

        let err = DataValidation::decimal(ValidationOperator::NotBetween, 0.5, None).unwrap_err();
        assert!(matches!(err, Error::InvalidCriterion { expected: 2, .. }));
    }

    #[test]
    fn test_single_operator_rejects_second_bound() {
        let err =
            DataValidation::text_length(ValidationOperator::LessThan, 10, Some(20)).unwrap_err();
        assert!(matches!(err, Error::InvalidCriterion { expected: 1, .. }));
    }

    #[test]
    fn test_between_validation() {
        let v = DataValidation::whole_number(ValidationOperator::Between, 1, Some(100)).unwrap();
        match &v.rule {
            ValidationRule::WholeNumber(c) => {
                assert_eq!(c.operator(), ValidationOperator::Between);
                assert_eq!(*c.first(), 1);
                assert_eq!(c.second(), Some(&100));
            }
            other => panic!("Expected WholeNumber rule, got {:?}", other),
        }
    }

    #[test]
    fn test_messages() {
        let v = DataValidation::custom("=LEN(A1)>2")
            .with_input_message("Code", "At least three characters")
            .with_error_alert("Too short", "Try again");
        assert_eq!(v.input_message.unwrap().title, "Code");
        assert_eq!(v.error_alert.unwrap().body, "Try again");
    }

    #[test]
    fn test_date_bound_formula() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(d.to_formula(), "45292");
        assert_eq!(NaiveDate::from_formula("45292"), Some(d));
        assert_eq!(f64::from_formula("2.5"), Some(2.5));
        assert_eq!(i64::from_formula("x"), None);
    }

    #[test]
    fn test_operator_roundtrip_names() {
        for op in [
            ValidationOperator::Between,
            ValidationOperator::NotBetween,
            ValidationOperator::Equal,
            ValidationOperator::NotEqual,
            ValidationOperator::GreaterThan,
            ValidationOperator::LessThan,
            ValidationOperator::GreaterThanOrEqual,
            ValidationOperator::LessThanOrEqual,
        ] {
            assert_eq!(ValidationOperator::from_xlsx(op.xlsx_operator()), Some(op));
        }
    }
}
