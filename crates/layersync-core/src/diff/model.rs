//! Difference output types.
//!
//! Changes carry the *raw* values from both sides, not the normalized forms:
//! the report shows values the way the operator's tools display them.

use serde::{Deserialize, Serialize};

use crate::model::FieldValue;

/// A single attribute-level difference between two matched records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name
    pub field: String,
    /// Raw value in the shared record
    pub old: FieldValue,
    /// Raw value in the user record
    pub new: FieldValue,
}

/// All detected differences for one matched key pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DifferenceSet {
    /// Attribute differences, in shared-schema field order
    pub fields: Vec<FieldChange>,
    /// True if both geometries were present, valid, and not exactly equal
    pub geometry_changed: bool,
}

impl DifferenceSet {
    /// True if no difference of any kind was detected.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.geometry_changed
    }

    /// Total number of reportable differences (the geometry marker counts
    /// as one).
    pub fn len(&self) -> usize {
        self.fields.len() + usize::from(self.geometry_changed)
    }
}
