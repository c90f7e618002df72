//! Value normalization for equality comparison.
//!
//! Records sourced from different tools represent "no value" as an actual
//! null, an empty string, or the literal text `NULL`; all of those must
//! compare equal. Normalization is applied to both sides before comparing
//! and never to the values shown in reports.

use serde::{Deserialize, Serialize};

use crate::model::FieldValue;

/// A value canonicalized for comparison.
///
/// Equality between `Integer` and `Real` is numeric: the datasets being
/// reconciled do not agree on column affinities, and `1` and `1.0` denote
/// the same attribute value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NormalizedValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl PartialEq for NormalizedValue {
    fn eq(&self, other: &Self) -> bool {
        use NormalizedValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Text(a), Text(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Real(a), Real(b)) => a == b,
            (Integer(a), Real(b)) | (Real(b), Integer(a)) => *a as f64 == *b,
            _ => false,
        }
    }
}

/// Canonicalize a scalar value for equality comparison.
///
/// - null → null
/// - text: trimmed; empty or case-insensitive `NULL` → null
/// - integers and reals pass through unchanged
/// - any other value is rendered to text and the text rule applied
pub fn normalize(value: &FieldValue) -> NormalizedValue {
    match value {
        FieldValue::Null => NormalizedValue::Null,
        FieldValue::Text(s) => normalize_text(s),
        FieldValue::Integer(i) => NormalizedValue::Integer(*i),
        FieldValue::Real(r) => NormalizedValue::Real(*r),
        other => normalize_text(&other.to_string()),
    }
}

fn normalize_text(s: &str) -> NormalizedValue {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.to_uppercase() == "NULL" {
        NormalizedValue::Null
    } else {
        NormalizedValue::Text(trimmed.to_string())
    }
}

/// Convert a normalized value back into a raw value.
///
/// Normalization composed with this conversion is idempotent:
/// `normalize(&v.into())` equals `v` for any normalized `v`.
impl From<NormalizedValue> for FieldValue {
    fn from(value: NormalizedValue) -> Self {
        match value {
            NormalizedValue::Null => FieldValue::Null,
            NormalizedValue::Text(s) => FieldValue::Text(s),
            NormalizedValue::Integer(i) => FieldValue::Integer(i),
            NormalizedValue::Real(r) => FieldValue::Real(r),
        }
    }
}
