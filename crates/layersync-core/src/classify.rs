//! Classification of the user dataset against the shared dataset.

use serde::{Deserialize, Serialize};

use crate::diff::{compare, DifferenceSet};
use crate::index::FeatureIndex;
use crate::model::Record;

/// A matched key pair whose records differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedEntry {
    /// Key text shared by both records
    pub key: String,
    /// The user record (the side that wins on apply)
    pub record: Record,
    /// The detected differences
    pub differences: DifferenceSet,
}

/// The partition of the user dataset's keys.
///
/// Keys present only in the shared dataset (deletions) are never surfaced
/// or acted on; deletion is out of scope by design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Classification {
    /// User records whose key is absent from the shared dataset
    pub new: Vec<Record>,
    /// Matched key pairs with at least one difference
    pub modified: Vec<ModifiedEntry>,
}

impl Classification {
    /// True if there is nothing to insert and nothing to update.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty()
    }

    /// Total number of records that would change on apply.
    pub fn change_count(&self) -> usize {
        self.new.len() + self.modified.len()
    }
}

/// Partition the user index against the shared index.
///
/// Every key of the user index lands in exactly one bucket: `new` when the
/// shared index has no such key, `modified` when both sides have it and the
/// difference engine finds a non-empty set, unchanged (dropped) otherwise.
/// Ordering follows the index iteration order (sorted by key).
pub fn classify(
    shared_index: &FeatureIndex,
    user_index: &FeatureIndex,
    key_field: &str,
) -> Classification {
    let mut new = Vec::new();
    let mut modified = Vec::new();

    for (key, user_record) in user_index.iter() {
        match shared_index.get(key) {
            None => new.push(user_record.clone()),
            Some(shared_record) => {
                let differences = compare(shared_record, user_record, key_field);
                if !differences.is_empty() {
                    modified.push(ModifiedEntry {
                        key: key.clone(),
                        record: user_record.clone(),
                        differences,
                    });
                }
            }
        }
    }

    Classification { new, modified }
}
