use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a schema field.
///
/// The variants match the scalar storage classes of the SQLite-backed
/// provider; boolean columns are stored as integers there but kept distinct
/// in the model so values render as `true`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Integer,
    Real,
    Bool,
}

/// A scalar attribute value as read from a dataset.
///
/// `Null` is a first-class value: datasets sourced from different tools
/// represent "no value" inconsistently (actual null, empty string, the
/// literal text `NULL`), and the normalizer collapses those for comparison.
/// Raw `FieldValue`s are kept alongside for human-readable display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl FieldValue {
    /// True if this value is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// The key-text form of a value.
///
/// `Null` renders as `NULL`, matching the convention of the host tools these
/// datasets come from; key extraction and key re-resolution both rely on
/// this rendering being stable.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}
