//! The reconcile operation: index both datasets, classify, report, and
//! optionally apply.
//!
//! Configuration faults (missing key field) are raised to the caller before
//! any analysis. Update-phase faults never surface as raised errors; they
//! come back as failure text embedded in the report.

use crate::classify::{classify, Classification};
use crate::dataset::Dataset;
use crate::errors::{Result, SyncError, SyncErrorKind};
use crate::index::FeatureIndex;
use crate::progress::ProgressSink;
use crate::report::{render_report, render_update_report};
use crate::update::{apply, UpdateReport};

/// Parameters of a reconcile run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Field whose text value identifies a logical record across datasets
    pub key_field: String,
    /// When true (the default), report differences without mutating anything
    pub preview_only: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key_field: "fuuid".to_string(),
            preview_only: true,
        }
    }
}

/// Everything a reconcile run produces.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// The computed partition of the user dataset's keys
    pub classification: Classification,
    /// The full report text, including the update fragment when an apply ran
    pub report: String,
    /// The update executor's account, when not in preview mode
    pub update: Option<UpdateReport>,
}

fn check_canceled(sink: &dyn ProgressSink, phase: &str) -> Result<()> {
    if sink.is_canceled() {
        Err(SyncError::new(SyncErrorKind::Canceled)
            .with_op(phase)
            .with_message("cancellation requested"))
    } else {
        Ok(())
    }
}

/// Run one reconciliation of `user` edits against the `shared` dataset.
///
/// # Errors
///
/// - `Configuration` — the key field is missing from either schema; raised
///   before any analysis, no partial report is produced.
/// - `Canceled` — the host raised the cancellation flag at a phase boundary.
///
/// Update-phase failures do not produce an `Err`: they are embedded in the
/// returned report and in `ReconcileOutcome::update`.
pub fn reconcile(
    shared: &mut dyn Dataset,
    user: &dyn Dataset,
    options: &ReconcileOptions,
    sink: &dyn ProgressSink,
) -> Result<ReconcileOutcome> {
    let key_field = options.key_field.as_str();

    if !shared.schema().contains(key_field) {
        return Err(SyncError::new(SyncErrorKind::Configuration)
            .with_op("reconcile")
            .with_field(key_field)
            .with_message("key field not found in the shared dataset"));
    }
    if !user.schema().contains(key_field) {
        return Err(SyncError::new(SyncErrorKind::Configuration)
            .with_op("reconcile")
            .with_field(key_field)
            .with_message("key field not found in the user dataset"));
    }

    sink.push_info("Starting difference analysis...");
    check_canceled(sink, "index")?;
    sink.set_progress(10);

    let shared_index = FeatureIndex::build(&*shared, key_field)?;
    sink.set_progress(30);

    let user_index = FeatureIndex::build(user, key_field)?;
    sink.set_progress(50);

    check_canceled(sink, "classify")?;
    sink.set_progress(70);

    let classification = classify(&shared_index, &user_index, key_field);
    sink.set_progress(90);

    let mut report = render_report(&classification, key_field);
    sink.set_progress(100);
    sink.push_info(&report);

    if !options.preview_only && !classification.is_empty() {
        check_canceled(sink, "update")?;
        sink.push_info("Proceeding with update...");

        let update = apply(shared, &classification, key_field, sink);
        report.push('\n');
        report.push_str(&render_update_report(&update));

        return Ok(ReconcileOutcome {
            classification,
            report,
            update: Some(update),
        });
    }

    Ok(ReconcileOutcome {
        classification,
        report,
        update: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use crate::model::{FieldDef, FieldType, FieldValue, Record, Schema};
    use crate::progress::{CaptureProgress, NullProgress};

    fn dataset(rows: &[(&str, &str)]) -> MemoryDataset {
        let schema = Schema::new(vec![
            FieldDef::new("fuuid", FieldType::Text),
            FieldDef::new("name", FieldType::Text),
        ]);
        let mut ds = MemoryDataset::new(schema);
        for (fuuid, name) in rows {
            let mut record = Record::new(ds.schema_arc());
            record.set_field("fuuid", FieldValue::Text(fuuid.to_string()));
            record.set_field("name", FieldValue::Text(name.to_string()));
            ds.insert(record);
        }
        ds
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut shared = dataset(&[("A", "Park")]);
        let user = dataset(&[("A", "Parco"), ("B", "Lake")]);

        let outcome = reconcile(
            &mut shared,
            &user,
            &ReconcileOptions::default(),
            &NullProgress,
        )
        .unwrap();

        assert!(outcome.update.is_none());
        assert_eq!(outcome.classification.new.len(), 1);
        assert_eq!(outcome.classification.modified.len(), 1);
        assert!(outcome.report.contains("NEW RECORDS TO INSERT: 1"));
        // Shared dataset untouched
        assert_eq!(shared.len(), 1);
        let a = &shared.find_by_key("fuuid", "A").unwrap()[0];
        assert_eq!(a.field("name"), Some(&FieldValue::Text("Park".to_string())));
    }

    #[test]
    fn test_apply_mode_mutates_and_appends_fragment() {
        let mut shared = dataset(&[("A", "Park")]);
        let user = dataset(&[("A", "Parco"), ("B", "Lake")]);
        let options = ReconcileOptions {
            preview_only: false,
            ..ReconcileOptions::default()
        };

        let outcome = reconcile(&mut shared, &user, &options, &NullProgress).unwrap();

        let update = outcome.update.expect("update report expected");
        assert!(update.outcome.is_committed());
        assert!(outcome.report.contains("UPDATE COMPLETED SUCCESSFULLY"));
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn test_apply_mode_without_changes_skips_update() {
        let mut shared = dataset(&[("A", "Park")]);
        let user = dataset(&[("A", "Park")]);
        let options = ReconcileOptions {
            preview_only: false,
            ..ReconcileOptions::default()
        };

        let outcome = reconcile(&mut shared, &user, &options, &NullProgress).unwrap();
        assert!(outcome.update.is_none());
        assert!(outcome.report.contains("NO DIFFERENCES FOUND"));
    }

    #[test]
    fn test_missing_key_field_is_raised_before_analysis() {
        let mut shared = dataset(&[("A", "Park")]);
        let user = dataset(&[("A", "Park")]);
        let options = ReconcileOptions {
            key_field: "gid".to_string(),
            ..ReconcileOptions::default()
        };

        let err = reconcile(&mut shared, &user, &options, &NullProgress).unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Configuration);
        assert!(err.to_string().contains("shared dataset"));
    }

    #[test]
    fn test_cancellation_at_phase_boundary() {
        let mut shared = dataset(&[("A", "Park")]);
        let user = dataset(&[("A", "Parco")]);
        let sink = CaptureProgress::new();
        sink.cancel();

        let err = reconcile(
            &mut shared,
            &user,
            &ReconcileOptions::default(),
            &sink,
        )
        .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Canceled);
    }

    #[test]
    fn test_progress_values_reported_in_order() {
        let mut shared = dataset(&[("A", "Park")]);
        let user = dataset(&[("A", "Park")]);
        let sink = CaptureProgress::new();

        reconcile(&mut shared, &user, &ReconcileOptions::default(), &sink).unwrap();
        assert_eq!(sink.progress_values(), [10, 30, 50, 70, 90, 100]);
    }

    #[test]
    fn test_commit_failure_surfaces_in_report_not_as_error() {
        let mut shared = dataset(&[("A", "Park")]);
        shared.poison_commit(vec!["database is locked".to_string()]);
        let user = dataset(&[("A", "Parco")]);
        let options = ReconcileOptions {
            preview_only: false,
            ..ReconcileOptions::default()
        };

        let outcome = reconcile(&mut shared, &user, &options, &NullProgress).unwrap();
        assert!(outcome.report.contains("UPDATE FAILED"));
        assert!(outcome.report.contains("database is locked"));
        let update = outcome.update.unwrap();
        assert!(!update.outcome.is_committed());
    }
}
