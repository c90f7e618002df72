//! End-to-end reconcile scenarios over the in-memory provider
//!
//! ## Scenarios Covered
//!
//! 1. A full run with new, modified, geometry-changed, and unchanged records
//! 2. Apply atomicity: forced commit failure leaves the dataset state
//!    verifiably unchanged
//! 3. Normalization keeping noisy-but-equal datasets in sync

use geo_types::{polygon, Geometry, Point};
use layersync_core::{
    reconcile, Dataset, FieldDef, FieldType, FieldValue, MemoryDataset, NullProgress, Record,
    ReconcileOptions, Schema,
};

fn schema() -> Schema {
    Schema::new(vec![
        FieldDef::new("fuuid", FieldType::Text),
        FieldDef::new("name", FieldType::Text),
        FieldDef::new("category", FieldType::Text),
    ])
}

fn record(
    ds: &MemoryDataset,
    fuuid: &str,
    name: &str,
    category: Option<&str>,
    geometry: Option<Geometry<f64>>,
) -> Record {
    let mut record = Record::new(ds.schema_arc());
    record.set_field("fuuid", FieldValue::Text(fuuid.to_string()));
    record.set_field("name", FieldValue::Text(name.to_string()));
    if let Some(category) = category {
        record.set_field("category", FieldValue::Text(category.to_string()));
    }
    if let Some(geometry) = geometry {
        record.set_geometry(geometry);
    }
    record
}

fn square() -> Geometry<f64> {
    polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)].into()
}

#[test]
fn test_full_run_with_mixed_changes() {
    // GIVEN a shared dataset and a user dataset that adds, modifies,
    // geometry-edits, and leaves records alone
    let mut shared = MemoryDataset::new(schema());
    let r = record(&shared, "same", "Unchanged", Some("park"), None);
    shared.insert(r);
    let r = record(&shared, "renamed", "Old Name", Some("park"), None);
    shared.insert(r);
    let r = record(&shared, "moved", "Pond", Some("water"), Some(square()));
    shared.insert(r);

    let mut user = MemoryDataset::new(schema());
    let r = record(&user, "same", "Unchanged", Some("park"), None);
    user.insert(r);
    let r = record(&user, "renamed", "New Name", Some("park"), None);
    user.insert(r);
    let r = record(
        &user,
        "moved",
        "Pond",
        Some("water"),
        Some(Geometry::Point(Point::new(10.0, 10.0))),
    );
    user.insert(r);
    let r = record(&user, "brand-new", "Trailhead", Some("access"), None);
    user.insert(r);

    // WHEN reconciling with apply enabled
    let options = ReconcileOptions {
        preview_only: false,
        ..ReconcileOptions::default()
    };
    let outcome = reconcile(&mut shared, &user, &options, &NullProgress).unwrap();

    // THEN the classification partitions correctly
    assert_eq!(outcome.classification.new.len(), 1);
    assert_eq!(outcome.classification.modified.len(), 2);
    let update = outcome.update.unwrap();
    assert!(update.outcome.is_committed());
    assert_eq!(update.added_count(), 1);
    assert_eq!(update.updated_count(), 2);

    // AND the shared dataset reflects every change
    assert_eq!(shared.len(), 4);
    let renamed = &shared.find_by_key("fuuid", "renamed").unwrap()[0];
    assert_eq!(
        renamed.field("name"),
        Some(&FieldValue::Text("New Name".to_string()))
    );
    let moved = &shared.find_by_key("fuuid", "moved").unwrap()[0];
    assert_eq!(
        moved.geometry(),
        Some(&Geometry::Point(Point::new(10.0, 10.0)))
    );

    // AND the report tells the whole story
    assert!(outcome.report.contains("NEW RECORDS TO INSERT: 1"));
    assert!(outcome.report.contains("MODIFIED RECORDS: 2"));
    assert!(outcome.report.contains("geometry: modified"));
    assert!(outcome.report.contains("UPDATE COMPLETED SUCCESSFULLY"));
}

#[test]
fn test_forced_commit_failure_leaves_state_unchanged() {
    let mut shared = MemoryDataset::new(schema());
    let r = record(&shared, "A", "Park", None, None);
    shared.insert(r);
    let before = shared.records().unwrap();

    let mut user = MemoryDataset::new(schema());
    let r = record(&user, "A", "Parco", None, None);
    user.insert(r);
    let r = record(&user, "B", "Lake", None, None);
    user.insert(r);

    shared.poison_commit(vec!["constraint failed".to_string(), "disk full".to_string()]);

    let options = ReconcileOptions {
        preview_only: false,
        ..ReconcileOptions::default()
    };
    let outcome = reconcile(&mut shared, &user, &options, &NullProgress).unwrap();

    // The operation reports failure instead of raising it
    assert!(outcome.report.contains("UPDATE FAILED"));
    assert!(outcome.report.contains("constraint failed; disk full"));
    assert!(outcome.report.contains("rolled back"));

    // Verified by re-reading: post-condition equals pre-condition
    assert_eq!(shared.records().unwrap(), before);
    assert!(!shared.is_editing());
}

#[test]
fn test_null_noise_does_not_produce_differences() {
    // Shared stores empty strings, user stores literal NULL and padding:
    // all normalize away
    let mut shared = MemoryDataset::new(schema());
    let mut r = record(&shared, "A", "Park", None, None);
    r.set_field("category", FieldValue::Text(String::new()));
    shared.insert(r);

    let mut user = MemoryDataset::new(schema());
    let mut r = record(&user, "A", "  Park  ", None, None);
    r.set_field("category", FieldValue::Text("NULL".to_string()));
    user.insert(r);

    let mut shared_view = shared.clone();
    let outcome = reconcile(
        &mut shared_view,
        &user,
        &ReconcileOptions::default(),
        &NullProgress,
    )
    .unwrap();

    assert!(outcome.classification.is_empty());
    assert!(outcome.report.contains("NO DIFFERENCES FOUND"));
}
