use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::value::{FieldType, FieldValue};

/// A single named, typed field in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within its schema
    pub name: String,
    /// Declared scalar type
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered field-name-to-type mapping shared by all records of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Create a schema from an ordered field list.
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// The ordered field definitions.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Position of a field by name, if present.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// True if a field with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Stable per-record positional identifier within a dataset.
///
/// Used only for targeted update operations (the SQLite provider maps it to
/// the rowid); never used for cross-dataset matching, which goes through the
/// key field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId(pub i64);

/// An ordered set of named field values plus an optional geometry.
///
/// Immutable once read from a dataset for the purposes of comparison; the
/// mutating accessors exist for constructing records to write back. Field
/// access goes through an explicit schema lookup, never reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    values: Vec<FieldValue>,
    geometry: Option<Geometry<f64>>,
    schema: Arc<Schema>,
}

impl Record {
    /// Create a record with all fields null and no geometry.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![FieldValue::Null; schema.len()];
        Self {
            id: RecordId(0),
            values,
            geometry: None,
            schema,
        }
    }

    /// Create a record with an explicit identifier and value vector.
    ///
    /// `values` must have exactly one entry per schema field; extra entries
    /// are truncated and missing entries filled with null.
    pub fn with_values(
        id: RecordId,
        schema: Arc<Schema>,
        mut values: Vec<FieldValue>,
        geometry: Option<Geometry<f64>>,
    ) -> Self {
        values.resize(schema.len(), FieldValue::Null);
        Self {
            id,
            values,
            geometry,
            schema,
        }
    }

    /// The record's positional identifier within its source dataset.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Set the record's positional identifier (used by dataset providers).
    pub fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// The schema this record conforms to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Shared handle to the schema.
    pub fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// The ordered field values.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Get a field value by name. `None` if the field is not in the schema.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.schema.field_index(name).map(|i| &self.values[i])
    }

    /// Set a field value by name. Returns false if the field is not in the
    /// schema (the value is dropped).
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> bool {
        match self.schema.field_index(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// The record's geometry, if any.
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    /// Replace the record's geometry.
    pub fn set_geometry(&mut self, geometry: Geometry<f64>) {
        self.geometry = Some(geometry);
    }

    /// The key text for this record: the text form of its value in
    /// `key_field`. `None` if the field is absent from the schema.
    pub fn key_text(&self, key_field: &str) -> Option<String> {
        self.field(key_field).map(|v| v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            FieldDef::new("fuuid", FieldType::Text),
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("area", FieldType::Real),
        ]))
    }

    #[test]
    fn test_schema_lookup() {
        let schema = test_schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.field_index("name"), Some(1));
        assert!(schema.contains("area"));
        assert!(!schema.contains("missing"));
    }

    #[test]
    fn test_new_record_is_all_null() {
        let record = Record::new(test_schema());
        assert!(record.values().iter().all(FieldValue::is_null));
        assert!(record.geometry().is_none());
    }

    #[test]
    fn test_field_accessors() {
        let mut record = Record::new(test_schema());
        assert!(record.set_field("name", FieldValue::Text("Park".to_string())));
        assert_eq!(
            record.field("name"),
            Some(&FieldValue::Text("Park".to_string()))
        );

        // Unknown field: not set, access yields None
        assert!(!record.set_field("missing", FieldValue::Integer(1)));
        assert!(record.field("missing").is_none());
    }

    #[test]
    fn test_key_text() {
        let mut record = Record::new(test_schema());
        record.set_field("fuuid", FieldValue::Text("abc-1".to_string()));
        assert_eq!(record.key_text("fuuid").as_deref(), Some("abc-1"));
        assert_eq!(record.key_text("missing"), None);

        // Null key renders as the NULL text form
        let empty = Record::new(test_schema());
        assert_eq!(empty.key_text("fuuid").as_deref(), Some("NULL"));
    }

    #[test]
    fn test_with_values_pads_and_truncates() {
        let schema = test_schema();
        let short = Record::with_values(
            RecordId(1),
            Arc::clone(&schema),
            vec![FieldValue::Text("a".to_string())],
            None,
        );
        assert_eq!(short.values().len(), 3);
        assert!(short.field("area").unwrap().is_null());

        let long = Record::with_values(
            RecordId(2),
            schema,
            vec![
                FieldValue::Text("a".to_string()),
                FieldValue::Text("b".to_string()),
                FieldValue::Real(1.0),
                FieldValue::Integer(9),
            ],
            None,
        );
        assert_eq!(long.values().len(), 3);
    }
}
