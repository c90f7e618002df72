//! Update executor: applies a classification to the shared dataset.
//!
//! State machine over the shared dataset's storage:
//! `Clean → Backed-up → Editing → {Committed | RolledBack}`.
//!
//! Once past the backup step, every fault is caught, converted to a
//! rollback, and returned inside the [`UpdateReport`]. The caller never
//! sees a raised error from the update phase, only report text indicating
//! success or failure.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::dataset::{Dataset, EditSession};
use crate::errors::{Result, SyncError, SyncErrorKind};
use crate::model::{Record, Schema};
use crate::progress::ProgressSink;

/// Outcome of one record inside the apply batch.
///
/// Per-item add failures and missing-key skips are not errors: they are
/// recorded here and the batch continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemOutcome {
    /// New record inserted into the shared dataset
    Added { key: String },
    /// New record could not be inserted; the batch continued
    AddFailed { key: String, reason: String },
    /// Existing record updated in place
    Updated { key: String },
    /// Key could not be re-resolved against the current dataset state
    /// (e.g. a concurrent external edit); silently skipped
    SkippedMissingKey { key: String },
}

/// Terminal state of the apply call.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// All pending changes were persisted; the dataset view was reloaded
    Committed,
    /// The update failed and every pending change was rolled back
    Failed { error: SyncError },
}

impl UpdateOutcome {
    /// True if the session committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, UpdateOutcome::Committed)
    }
}

/// Full account of an apply call: terminal state, backup location, and the
/// per-item outcomes of both batches.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub outcome: UpdateOutcome,
    /// Backup file created before mutation, if the dataset is file-backed
    pub backup_path: Option<PathBuf>,
    pub additions: Vec<ItemOutcome>,
    pub modifications: Vec<ItemOutcome>,
}

impl UpdateReport {
    fn failed(error: SyncError, backup_path: Option<PathBuf>) -> Self {
        Self {
            outcome: UpdateOutcome::Failed { error },
            backup_path,
            additions: Vec::new(),
            modifications: Vec::new(),
        }
    }

    /// Records successfully added.
    pub fn added_count(&self) -> usize {
        self.additions
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Added { .. }))
            .count()
    }

    /// Additions that failed and were skipped.
    pub fn add_failed_count(&self) -> usize {
        self.additions
            .iter()
            .filter(|o| matches!(o, ItemOutcome::AddFailed { .. }))
            .count()
    }

    /// Records successfully updated.
    pub fn updated_count(&self) -> usize {
        self.modifications
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Updated { .. }))
            .count()
    }

    /// Modifications skipped because the key no longer resolved.
    pub fn skipped_count(&self) -> usize {
        self.modifications
            .iter()
            .filter(|o| matches!(o, ItemOutcome::SkippedMissingKey { .. }))
            .count()
    }
}

/// Copy the backing storage file to a timestamped sibling path.
///
/// The backup is retained for manual recovery and never cleaned up.
fn create_backup(source: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = PathBuf::from(format!("{}.backup_{}", source.display(), stamp));
    fs::copy(source, &backup_path).map_err(|e| {
        SyncError::new(SyncErrorKind::Io)
            .with_op("create_backup")
            .with_message(format!(
                "cannot copy {} to {}: {}",
                source.display(),
                backup_path.display(),
                e
            ))
    })?;
    Ok(backup_path)
}

/// Apply additions and modifications to the shared dataset inside a
/// transactional edit session, with backup-before-write.
///
/// The persisted state after this returns is either fully updated or
/// identical to the pre-call state (plus the retained backup file), with
/// the caveat that additions are best-effort per record, so "fully updated"
/// holds for the records that individually succeeded.
pub fn apply(
    dataset: &mut dyn Dataset,
    classification: &Classification,
    key_field: &str,
    sink: &dyn ProgressSink,
) -> UpdateReport {
    // Backup before any mutation. A dataset without a file backing is fine;
    // a backing file we cannot copy aborts the whole operation.
    let backup_path = match dataset.storage_path() {
        Some(path) => match create_backup(path) {
            Ok(backup) => {
                sink.push_info(&format!("Backup created: {}", backup.display()));
                tracing::info!(backup = %backup.display(), "storage backup created");
                Some(backup)
            }
            Err(e) => return UpdateReport::failed(e, None),
        },
        None => None,
    };

    // Reach a known baseline: a leftover session from a prior failed run is
    // committed before we open ours.
    if dataset.is_editing() {
        if let Err(e) = dataset.commit() {
            return UpdateReport::failed(
                SyncError::new(SyncErrorKind::EditSession)
                    .with_op("flush_pending")
                    .with_message("cannot commit leftover edits before starting")
                    .with_source(e),
                backup_path,
            );
        }
    }

    let mut additions = Vec::new();
    let mut modifications = Vec::new();

    let commit_result = {
        let mut session = match EditSession::begin(&mut *dataset) {
            Ok(session) => session,
            Err(e) => return UpdateReport::failed(e, backup_path),
        };

        let shared_schema = session.dataset().schema_arc();

        // Additions are best-effort: one bad record does not sink the batch.
        if !classification.new.is_empty() {
            sink.push_info(&format!(
                "Adding {} new records...",
                classification.new.len()
            ));
        }
        for record in &classification.new {
            let key = record
                .key_text(key_field)
                .unwrap_or_else(|| "<missing key>".to_string());
            let incoming = conform_record(record, &shared_schema);
            match session.dataset().add_record(&incoming) {
                Ok(_) => additions.push(ItemOutcome::Added { key }),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to add record");
                    sink.push_info(&format!("Problem adding record {}", key));
                    additions.push(ItemOutcome::AddFailed {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !classification.modified.is_empty() {
            sink.push_info(&format!(
                "Updating {} records...",
                classification.modified.len()
            ));
        }
        let modification_result = apply_modifications(
            &mut session,
            classification,
            key_field,
            &shared_schema,
            &mut modifications,
        );

        match modification_result {
            Ok(()) => {
                sink.push_info("Saving changes...");
                // commit rolls back internally on failure
                session.commit()
            }
            Err(e) => {
                let error = SyncError::new(SyncErrorKind::Unexpected)
                    .with_op("apply")
                    .with_message("update phase failed")
                    .with_source(e);
                match session.rollback() {
                    Ok(()) => Err(error),
                    Err(rollback_err) => {
                        tracing::warn!(error = %rollback_err, "rollback failed");
                        Err(error)
                    }
                }
            }
        }
    };

    match commit_result {
        Ok(()) => {
            if let Err(e) = dataset.reload() {
                // The commit stands; only the in-memory view is stale.
                tracing::warn!(error = %e, "reload after commit failed");
            }
            UpdateReport {
                outcome: UpdateOutcome::Committed,
                backup_path,
                additions,
                modifications,
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "update failed, changes rolled back");
            UpdateReport {
                outcome: UpdateOutcome::Failed { error },
                backup_path,
                additions,
                modifications,
            }
        }
    }
}

/// Build a record conforming exactly to the shared schema, copying only
/// the fields present in both schemas plus the geometry if present.
fn conform_record(record: &Record, shared_schema: &Arc<Schema>) -> Record {
    let mut incoming = Record::new(Arc::clone(shared_schema));
    for def in shared_schema.fields() {
        if let Some(value) = record.field(&def.name) {
            incoming.set_field(&def.name, value.clone());
        }
    }
    if let Some(geometry) = record.geometry() {
        incoming.set_geometry(geometry.clone());
    }
    incoming
}

/// Update each modified entry against the *current* dataset state.
///
/// A key that no longer resolves is skipped silently (accepted race with
/// external writers); any storage fault aborts with an error the caller
/// converts into rollback.
fn apply_modifications(
    session: &mut EditSession<'_>,
    classification: &Classification,
    key_field: &str,
    shared_schema: &Arc<Schema>,
    modifications: &mut Vec<ItemOutcome>,
) -> Result<()> {
    for entry in &classification.modified {
        let matches = session.dataset().find_by_key(key_field, &entry.key)?;
        let Some(current) = matches.into_iter().next() else {
            tracing::info!(key = %entry.key, "key not found during update, skipping");
            modifications.push(ItemOutcome::SkippedMissingKey {
                key: entry.key.clone(),
            });
            continue;
        };

        let id = current.id();
        for def in shared_schema.fields() {
            let name = def.name.as_str();
            if name == key_field {
                continue;
            }
            if let Some(value) = entry.record.field(name) {
                session.dataset().change_field_value(id, name, value)?;
            }
        }
        if let Some(geometry) = entry.record.geometry() {
            session.dataset().change_geometry(id, geometry)?;
        }
        modifications.push(ItemOutcome::Updated {
            key: entry.key.clone(),
        });
    }
    Ok(())
}
