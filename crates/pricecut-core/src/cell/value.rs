//! Cell value types

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value
    Number(f64),

    /// Date or time as an Excel serial number (1900 system), for numbers
    /// whose cell style has a date format
    DateTime(f64),

    /// String value
    String(SharedString),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),

    /// Formula with the result cached by the application that saved the file
    Formula {
        /// Formula text including the leading `=`
        text: String,
        /// Last calculated value (if any)
        cached_value: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(SharedString::new(s.into()))
    }

    /// Create a new formula value
    pub fn formula<S: Into<String>>(text: S) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached_value: None,
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Get the value as a number, without any conversion
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a boolean, without any conversion
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a string slice, without any conversion
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Convert the value to a number.
    ///
    /// Numbers pass through, booleans become `1.0`/`0.0` and text is parsed
    /// after trimming surrounding whitespace; single underscores between
    /// digits are allowed as grouping (`1_000`). Dates are not numbers.
    /// Formulas are never evaluated, so they fail along with errors and
    /// empty cells.
    ///
    /// ```
    /// use pricecut_core::CellValue;
    ///
    /// assert_eq!(CellValue::Number(12.5).coerce_number(), Ok(12.5));
    /// assert_eq!(CellValue::from(" 40 ").coerce_number(), Ok(40.0));
    /// assert_eq!(CellValue::from("1_000").coerce_number(), Ok(1000.0));
    /// assert!(CellValue::from("n/a").coerce_number().is_err());
    /// ```
    pub fn coerce_number(&self) -> Result<f64, CoercionError> {
        match self {
            CellValue::Number(n) => Ok(*n),
            CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            CellValue::String(s) => {
                parse_number_text(s.as_str()).ok_or_else(|| CoercionError::new(self))
            }
            CellValue::Empty
            | CellValue::DateTime(_)
            | CellValue::Error(_)
            | CellValue::Formula { .. } => Err(CoercionError::new(self)),
        }
    }

    /// Calendar value of a [`CellValue::DateTime`] serial
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(serial) => serial_to_datetime(*serial),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::DateTime(_) => "datetime",
            CellValue::String(_) => "string",
            CellValue::Error(_) => "error",
            CellValue::Formula { .. } => "formula",
        }
    }
}

/// Formula cells display their text, not their cached result.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{}", serial),
            },
            CellValue::String(s) => write!(f, "{}", s.as_str()),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula { text, .. } => write!(f, "{}", text),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::string(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Parse trimmed text as a float, allowing `_` between digits
fn parse_number_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if !text.contains('_') {
        return text.parse().ok();
    }

    let chars: Vec<char> = text.chars().collect();
    let grouped = chars.iter().enumerate().all(|(i, &c)| {
        c != '_'
            || (i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(char::is_ascii_digit))
    });
    if !grouped {
        return None;
    }
    text.replace('_', "").parse().ok()
}

/// Convert a 1900-system serial to a date and time.
///
/// Serials below 60 are shifted by a day to undo the fictional 1900-02-29.
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = if serial < 60.0 { serial + 1.0 } else { serial };
    let millis = (days * 86_400_000.0).round();
    if millis > i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(Duration::milliseconds(millis as i64))
}

/// A cell value that could not be read as a number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read {type_name} value '{text}' as a number")]
pub struct CoercionError {
    /// Display text of the offending value
    pub text: String,
    /// Type name of the offending value
    pub type_name: &'static str,
}

impl CoercionError {
    fn new(value: &CellValue) -> Self {
        Self {
            text: value.to_string(),
            type_name: value.type_name(),
        }
    }
}

/// Excel error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL!
    Null,
    /// #DIV/0!
    Div0,
    /// #VALUE!
    Value,
    /// #REF!
    Ref,
    /// #NAME?
    Name,
    /// #NUM!
    Num,
    /// #N/A
    Na,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
        }
    }

    /// Parse an error literal such as `#DIV/0!` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference-counted string so repeated shared-string entries don't copy
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    /// Create a new shared string
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length of the string in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}
