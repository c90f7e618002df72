//! Dataset provider interface and the scoped edit session.
//!
//! A [`Dataset`] is the storage-side collaborator of the reconciler: an
//! ordered collection of records with a shared schema, an optional file
//! backing, and a transactional mutation protocol. The provider trait is the
//! seam between the core algorithms and concrete storage (in-memory here,
//! SQLite in `layersync-store`).

mod memory;

pub use memory::MemoryDataset;

use geo_types::Geometry;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{Result, SyncError, SyncErrorKind};
use crate::model::{FieldValue, Record, RecordId, Schema};

/// Storage-side collaborator yielding records and accepting transactional
/// mutations.
///
/// Mutation methods other than `begin_edit` require an open edit session;
/// providers reject them otherwise. `commit` either persists every pending
/// change or fails carrying the storage layer's messages, leaving the
/// session open so the caller can roll back.
pub trait Dataset {
    /// The dataset's field schema.
    fn schema(&self) -> &Schema;

    /// Shared handle to the schema, for constructing conforming records.
    fn schema_arc(&self) -> Arc<Schema>;

    /// All records, fully materialized.
    fn records(&self) -> Result<Vec<Record>>;

    /// Path of the backing storage file, or `None` when not file-backed.
    fn storage_path(&self) -> Option<&Path>;

    /// True while an edit session is open.
    fn is_editing(&self) -> bool;

    /// Open an edit session. Fails if one is already open.
    fn begin_edit(&mut self) -> Result<()>;

    /// Add a record. The record's identifier is assigned by the provider.
    fn add_record(&mut self, record: &Record) -> Result<RecordId>;

    /// Change a single field value of an existing record.
    fn change_field_value(&mut self, id: RecordId, field: &str, value: &FieldValue)
        -> Result<()>;

    /// Change the geometry of an existing record.
    fn change_geometry(&mut self, id: RecordId, geometry: &Geometry<f64>) -> Result<()>;

    /// Persist all pending changes atomically.
    fn commit(&mut self) -> Result<()>;

    /// Discard all pending changes, returning to the pre-session state.
    fn rollback(&mut self) -> Result<()>;

    /// Refresh the in-memory view from storage.
    fn reload(&mut self) -> Result<()>;

    /// Exact-match query: records whose `field` value, as text, equals
    /// `key_text`. Evaluated against the current (possibly mid-edit) state.
    fn find_by_key(&self, field: &str, key_text: &str) -> Result<Vec<Record>>;
}

/// A scoped edit session over a dataset.
///
/// Every exit path resolves the session: `commit` and `rollback` consume it,
/// and dropping an unresolved session rolls back. This replaces ambient
/// "is editable" state with a value whose lifetime is the transaction.
pub struct EditSession<'a> {
    dataset: &'a mut dyn Dataset,
    finished: bool,
}

impl<'a> EditSession<'a> {
    /// Begin an edit session.
    ///
    /// # Errors
    ///
    /// `EditSession` — the provider refused to enter edit mode. No mutation
    /// has occurred.
    pub fn begin(dataset: &'a mut dyn Dataset) -> Result<Self> {
        dataset.begin_edit().map_err(|e| {
            SyncError::new(SyncErrorKind::EditSession)
                .with_op("begin_edit")
                .with_message("cannot start editing the dataset")
                .with_source(e)
        })?;
        Ok(Self {
            dataset,
            finished: false,
        })
    }

    /// The dataset under edit.
    pub fn dataset(&mut self) -> &mut dyn Dataset {
        &mut *self.dataset
    }

    /// Commit all pending changes.
    ///
    /// On commit failure the session rolls back before returning the error,
    /// so the dataset is back at its pre-session state either way.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        match self.dataset.commit() {
            Ok(()) => Ok(()),
            Err(commit_err) => {
                if let Err(rollback_err) = self.dataset.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                Err(commit_err)
            }
        }
    }

    /// Roll back all pending changes.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.dataset.rollback()
    }
}

impl Drop for EditSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.dataset.rollback() {
                tracing::warn!(error = %e, "implicit rollback on session drop failed");
            }
        }
    }
}
