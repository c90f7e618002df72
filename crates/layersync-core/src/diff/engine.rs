//! Field-by-field and geometry comparison of two matched records.

use geo::Validation;

use crate::model::{FieldValue, Record};
use crate::normalize::normalize;

use super::model::{DifferenceSet, FieldChange};

/// Compare a shared record against the user record carrying candidate edits.
///
/// Walks the shared record's schema (minus the key field); fields absent
/// from the user schema are skipped entirely: schema drift is tolerated,
/// not reported. Values compare in normalized form, but the emitted change
/// carries the raw values for display.
///
/// Geometry is compared only when both records carry one and both are valid
/// under the geometric-validity predicate; equality is exact, not
/// within-tolerance. Missing or invalid geometries are silently skipped,
/// since equality testing over invalid geometry is unreliable and would
/// produce false positives.
pub fn compare(shared: &Record, user: &Record, key_field: &str) -> DifferenceSet {
    let mut fields = Vec::new();

    for def in shared.schema().fields() {
        let name = def.name.as_str();
        if name == key_field {
            continue;
        }
        if !user.schema().contains(name) {
            continue;
        }

        let shared_value = shared.field(name).cloned().unwrap_or(FieldValue::Null);
        let user_value = user.field(name).cloned().unwrap_or(FieldValue::Null);

        if normalize(&shared_value) != normalize(&user_value) {
            fields.push(FieldChange {
                field: name.to_string(),
                old: shared_value,
                new: user_value,
            });
        }
    }

    let geometry_changed = match (shared.geometry(), user.geometry()) {
        (Some(a), Some(b)) => a.is_valid() && b.is_valid() && a != b,
        _ => false,
    };

    DifferenceSet {
        fields,
        geometry_changed,
    }
}
