//! In-memory dataset provider.
//!
//! Single-threaded, clone-based rollback baseline. Not file-backed, so the
//! update executor skips the storage backup for it. The `poison_*` hooks
//! exist to exercise failure paths in tests.

use geo_types::Geometry;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{Result, SyncError, SyncErrorKind};
use crate::model::{FieldValue, Record, RecordId, Schema};

use super::Dataset;

/// Ordered in-memory dataset: records keep insertion order, matching the
/// positional semantics of file-backed providers.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    schema: Arc<Schema>,
    records: Vec<Record>,
    next_id: i64,
    editing: bool,
    baseline: Option<Vec<Record>>,
    poisoned_commit: Option<Vec<String>>,
    poisoned_add: Option<String>,
}

impl MemoryDataset {
    /// Create an empty dataset with the given schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            records: Vec::new(),
            next_id: 1,
            editing: false,
            baseline: None,
            poisoned_commit: None,
            poisoned_add: None,
        }
    }

    /// Insert a record directly, outside any edit session.
    ///
    /// Fixture seeding only; reconciliation mutations go through the edit
    /// session protocol.
    pub fn insert(&mut self, mut record: Record) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        record.set_id(id);
        self.records.push(record);
        id
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Force the next commit to fail with the given storage messages.
    ///
    /// Cleared by rollback. Test hook for the forced-commit-failure path.
    pub fn poison_commit(&mut self, messages: Vec<String>) {
        self.poisoned_commit = Some(messages);
    }

    /// Force every `add_record` call to fail with the given message.
    ///
    /// Test hook for the best-effort addition path.
    pub fn poison_add(&mut self, message: impl Into<String>) {
        self.poisoned_add = Some(message.into());
    }

    fn record_position(&self, id: RecordId) -> Result<usize> {
        self.records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| {
                SyncError::new(SyncErrorKind::Persistence)
                    .with_op("memory_lookup")
                    .with_message(format!("no record with id {}", id.0))
            })
    }

    fn require_editing(&self, op: &str) -> Result<()> {
        if self.editing {
            Ok(())
        } else {
            Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op(op)
                .with_message("dataset is not in edit mode"))
        }
    }
}

impl Dataset for MemoryDataset {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn records(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }

    fn storage_path(&self) -> Option<&Path> {
        None
    }

    fn is_editing(&self) -> bool {
        self.editing
    }

    fn begin_edit(&mut self) -> Result<()> {
        if self.editing {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("begin_edit")
                .with_message("an edit session is already open"));
        }
        self.baseline = Some(self.records.clone());
        self.editing = true;
        Ok(())
    }

    fn add_record(&mut self, record: &Record) -> Result<RecordId> {
        self.require_editing("add_record")?;
        if let Some(message) = &self.poisoned_add {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("add_record")
                .with_message(message.clone()));
        }
        Ok(self.insert(record.clone()))
    }

    fn change_field_value(
        &mut self,
        id: RecordId,
        field: &str,
        value: &FieldValue,
    ) -> Result<()> {
        self.require_editing("change_field_value")?;
        let pos = self.record_position(id)?;
        if !self.records[pos].set_field(field, value.clone()) {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("change_field_value")
                .with_field(field)
                .with_message("no such field in schema"));
        }
        Ok(())
    }

    fn change_geometry(&mut self, id: RecordId, geometry: &Geometry<f64>) -> Result<()> {
        self.require_editing("change_geometry")?;
        let pos = self.record_position(id)?;
        self.records[pos].set_geometry(geometry.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.require_editing("commit")?;
        if let Some(messages) = self.poisoned_commit.clone() {
            // Session stays open: the caller decides to roll back.
            return Err(SyncError::new(SyncErrorKind::Commit)
                .with_op("commit")
                .with_message("storage rejected the commit")
                .with_details(messages));
        }
        self.baseline = None;
        self.editing = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(baseline) = self.baseline.take() {
            self.records = baseline;
        }
        self.editing = false;
        self.poisoned_commit = None;
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    fn find_by_key(&self, field: &str, key_text: &str) -> Result<Vec<Record>> {
        if !self.schema.contains(field) {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("find_by_key")
                .with_field(field)
                .with_message("no such field in schema"));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.key_text(field).as_deref() == Some(key_text))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldType};

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDef::new("fuuid", FieldType::Text),
            FieldDef::new("name", FieldType::Text),
        ])
    }

    fn seeded() -> MemoryDataset {
        let mut ds = MemoryDataset::new(schema());
        for (fuuid, name) in [("A", "Park"), ("B", "Lake")] {
            let mut record = Record::new(ds.schema_arc());
            record.set_field("fuuid", FieldValue::Text(fuuid.to_string()));
            record.set_field("name", FieldValue::Text(name.to_string()));
            ds.insert(record);
        }
        ds
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let ds = seeded();
        let records = ds.records().unwrap();
        assert_eq!(records[0].id(), RecordId(1));
        assert_eq!(records[1].id(), RecordId(2));
    }

    #[test]
    fn test_mutation_requires_edit_session() {
        let mut ds = seeded();
        let record = Record::new(ds.schema_arc());
        let err = ds.add_record(&record).unwrap_err();
        assert!(err.to_string().contains("not in edit mode"));
    }

    #[test]
    fn test_rollback_restores_baseline() {
        let mut ds = seeded();
        ds.begin_edit().unwrap();
        ds.change_field_value(
            RecordId(1),
            "name",
            &FieldValue::Text("Changed".to_string()),
        )
        .unwrap();
        ds.rollback().unwrap();

        let records = ds.records().unwrap();
        assert_eq!(
            records[0].field("name"),
            Some(&FieldValue::Text("Park".to_string()))
        );
    }

    #[test]
    fn test_poisoned_commit_keeps_session_open() {
        let mut ds = seeded();
        ds.poison_commit(vec!["disk full".to_string()]);
        ds.begin_edit().unwrap();
        let err = ds.commit().unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Commit);
        assert_eq!(err.details(), &["disk full".to_string()]);
        assert!(ds.is_editing());
        ds.rollback().unwrap();
        assert!(!ds.is_editing());
    }

    #[test]
    fn test_find_by_key_exact_text_match() {
        let ds = seeded();
        let hits = ds.find_by_key("fuuid", "A").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].field("name"),
            Some(&FieldValue::Text("Park".to_string()))
        );
        assert!(ds.find_by_key("fuuid", "Z").unwrap().is_empty());
        assert!(ds.find_by_key("missing", "A").is_err());
    }
}
