//! Core data model: scalar field values, schemas, and records.

mod record;
mod value;

pub use record::{FieldDef, Record, RecordId, Schema};
pub use value::{FieldType, FieldValue};
