//! Human-readable report rendering.
//!
//! The report is a summary for the operator, not a machine-complete audit
//! trail; the full classification stays available to the caller. Truncation
//! limits are fixed policy.

use chrono::Local;

use crate::classify::Classification;
use crate::update::{UpdateOutcome, UpdateReport};

/// At most this many new/modified records are listed explicitly.
const MAX_LISTED_RECORDS: usize = 10;
/// At most this many differences are listed per modified record.
const MAX_LISTED_DIFFERENCES: usize = 5;

/// Render the classification as a multi-section text report.
pub fn render_report(classification: &Classification, key_field: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=== RECONCILIATION REPORT ===".to_string());
    lines.push(format!(
        "Generated: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(format!("Key field: {}", key_field));
    lines.push(String::new());

    if !classification.new.is_empty() {
        lines.push(format!(
            "NEW RECORDS TO INSERT: {}",
            classification.new.len()
        ));
        for record in classification.new.iter().take(MAX_LISTED_RECORDS) {
            let key = record
                .key_text(key_field)
                .unwrap_or_else(|| "<missing key>".to_string());
            lines.push(format!("  - {}: {}", key_field, key));
        }
        if classification.new.len() > MAX_LISTED_RECORDS {
            lines.push(format!(
                "  ... and {} more records",
                classification.new.len() - MAX_LISTED_RECORDS
            ));
        }
        lines.push(String::new());
    }

    if !classification.modified.is_empty() {
        lines.push(format!(
            "MODIFIED RECORDS: {}",
            classification.modified.len()
        ));
        for entry in classification.modified.iter().take(MAX_LISTED_RECORDS) {
            lines.push(format!("  - {}: {}", key_field, entry.key));
            let mut listed = 0;
            for change in &entry.differences.fields {
                if listed == MAX_LISTED_DIFFERENCES {
                    break;
                }
                lines.push(format!(
                    "    {}: '{}' → '{}'",
                    change.field, change.old, change.new
                ));
                listed += 1;
            }
            if entry.differences.geometry_changed && listed < MAX_LISTED_DIFFERENCES {
                lines.push("    geometry: modified".to_string());
                listed += 1;
            }
            let total = entry.differences.len();
            if total > listed {
                lines.push(format!("    ... and {} more differences", total - listed));
            }
            lines.push(String::new());
        }
        if classification.modified.len() > MAX_LISTED_RECORDS {
            lines.push(format!(
                "  ... and {} more modified records",
                classification.modified.len() - MAX_LISTED_RECORDS
            ));
        }
    }

    if classification.is_empty() {
        lines.push("NO DIFFERENCES FOUND".to_string());
        lines.push("The datasets are already in sync.".to_string());
    }

    lines.join("\n")
}

/// Render the update executor's outcome as a report fragment, appended to
/// the classification report when an apply ran.
pub fn render_update_report(update: &UpdateReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(backup) = &update.backup_path {
        lines.push(format!("Backup created: {}", backup.display()));
    }

    match &update.outcome {
        UpdateOutcome::Committed => {
            if !update.additions.is_empty() {
                let failed = update.add_failed_count();
                if failed > 0 {
                    lines.push(format!(
                        "Added {} new records ({} failed)",
                        update.added_count(),
                        failed
                    ));
                } else {
                    lines.push(format!("Added {} new records", update.added_count()));
                }
            }
            if !update.modifications.is_empty() {
                let skipped = update.skipped_count();
                if skipped > 0 {
                    lines.push(format!(
                        "Updated {} records ({} skipped: key not found)",
                        update.updated_count(),
                        skipped
                    ));
                } else {
                    lines.push(format!("Updated {} records", update.updated_count()));
                }
            }
            lines.push("UPDATE COMPLETED SUCCESSFULLY".to_string());
        }
        UpdateOutcome::Failed { error } => {
            lines.push(format!("UPDATE FAILED: {}", error));
            lines.push("All pending changes were rolled back.".to_string());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ModifiedEntry;
    use crate::diff::{DifferenceSet, FieldChange};
    use crate::errors::{SyncError, SyncErrorKind};
    use crate::model::{FieldDef, FieldType, FieldValue, Record, Schema};
    use crate::update::ItemOutcome;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            FieldDef::new("fuuid", FieldType::Text),
            FieldDef::new("name", FieldType::Text),
        ]))
    }

    fn keyed_record(key: &str) -> Record {
        let mut record = Record::new(schema());
        record.set_field("fuuid", FieldValue::Text(key.to_string()));
        record
    }

    fn change(field: &str, old: &str, new: &str) -> FieldChange {
        FieldChange {
            field: field.to_string(),
            old: FieldValue::Text(old.to_string()),
            new: FieldValue::Text(new.to_string()),
        }
    }

    #[test]
    fn test_empty_classification_reports_success() {
        let report = render_report(&Classification::default(), "fuuid");
        assert!(report.contains("NO DIFFERENCES FOUND"));
        assert!(report.contains("already in sync"));
        assert!(report.contains("Key field: fuuid"));
    }

    #[test]
    fn test_new_records_truncated_at_ten() {
        let classification = Classification {
            new: (0..15).map(|i| keyed_record(&format!("k{:02}", i))).collect(),
            modified: Vec::new(),
        };
        let report = render_report(&classification, "fuuid");

        assert!(report.contains("NEW RECORDS TO INSERT: 15"));
        for i in 0..10 {
            assert!(report.contains(&format!("fuuid: k{:02}", i)), "missing k{:02}", i);
        }
        assert!(!report.contains("k10"));
        assert!(report.contains("... and 5 more records"));
    }

    #[test]
    fn test_differences_truncated_at_five() {
        let differences = DifferenceSet {
            fields: (0..7)
                .map(|i| change(&format!("f{}", i), "old", "new"))
                .collect(),
            geometry_changed: false,
        };
        let classification = Classification {
            new: Vec::new(),
            modified: vec![ModifiedEntry {
                key: "A".to_string(),
                record: keyed_record("A"),
                differences,
            }],
        };
        let report = render_report(&classification, "fuuid");

        assert!(report.contains("MODIFIED RECORDS: 1"));
        assert!(report.contains("f4: 'old' → 'new'"));
        assert!(!report.contains("f5:"));
        assert!(report.contains("... and 2 more differences"));
    }

    #[test]
    fn test_geometry_marker_rendered() {
        let classification = Classification {
            new: Vec::new(),
            modified: vec![ModifiedEntry {
                key: "A".to_string(),
                record: keyed_record("A"),
                differences: DifferenceSet {
                    fields: vec![change("name", "Park", "Parco")],
                    geometry_changed: true,
                },
            }],
        };
        let report = render_report(&classification, "fuuid");

        assert!(report.contains("name: 'Park' → 'Parco'"));
        assert!(report.contains("geometry: modified"));
    }

    #[test]
    fn test_update_fragment_success() {
        let update = UpdateReport {
            outcome: UpdateOutcome::Committed,
            backup_path: Some("/data/shared.db.backup_20260101_120000".into()),
            additions: vec![ItemOutcome::Added {
                key: "B".to_string(),
            }],
            modifications: vec![
                ItemOutcome::Updated {
                    key: "A".to_string(),
                },
                ItemOutcome::SkippedMissingKey {
                    key: "C".to_string(),
                },
            ],
        };
        let fragment = render_update_report(&update);

        assert!(fragment.contains("Backup created: /data/shared.db.backup_20260101_120000"));
        assert!(fragment.contains("Added 1 new records"));
        assert!(fragment.contains("Updated 1 records (1 skipped: key not found)"));
        assert!(fragment.contains("UPDATE COMPLETED SUCCESSFULLY"));
    }

    #[test]
    fn test_update_fragment_failure_carries_storage_messages() {
        let update = UpdateReport {
            outcome: UpdateOutcome::Failed {
                error: SyncError::new(SyncErrorKind::Commit)
                    .with_op("commit")
                    .with_message("storage rejected the commit")
                    .with_details(vec!["disk I/O error".to_string()]),
            },
            backup_path: None,
            additions: Vec::new(),
            modifications: Vec::new(),
        };
        let fragment = render_update_report(&update);

        assert!(fragment.contains("UPDATE FAILED"));
        assert!(fragment.contains("disk I/O error"));
        assert!(fragment.contains("rolled back"));
    }
}
