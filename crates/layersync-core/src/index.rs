//! Feature indexing: key text → record, built once per dataset per run.

use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::errors::{Result, SyncError, SyncErrorKind};
use crate::model::Record;

/// A mapping from key value (as text) to record, built from one dataset.
///
/// Keys are the exact text form of the key field value, with no
/// normalization. Duplicate keys resolve last-occurrence-wins; callers that
/// care which record wins must deduplicate upstream.
///
/// Backed by a `BTreeMap`, so iteration (and everything derived from it,
/// including report ordering) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    entries: BTreeMap<String, Record>,
}

impl FeatureIndex {
    /// Index every record of `dataset` by the text form of its `key_field`
    /// value.
    ///
    /// # Errors
    ///
    /// `Configuration` — `key_field` is absent from the dataset's schema.
    /// Surfaced before any record is read.
    pub fn build(dataset: &dyn Dataset, key_field: &str) -> Result<Self> {
        if !dataset.schema().contains(key_field) {
            return Err(SyncError::new(SyncErrorKind::Configuration)
                .with_op("index")
                .with_field(key_field)
                .with_message("key field not found in dataset schema"));
        }

        let mut entries = BTreeMap::new();
        for record in dataset.records()? {
            // Schema membership was checked above, so key_text is Some.
            if let Some(key) = record.key_text(key_field) {
                entries.insert(key, record);
            }
        }
        Ok(Self { entries })
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no records were indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a record by key text.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    /// True if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over `(key, record)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.entries.iter()
    }

    /// Iterate over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}
