//! LayerSync Core - reconciliation of keyed geospatial vector datasets
//!
//! This crate provides the algorithms and data structures for reconciling a
//! user dataset of candidate edits against a shared authoritative dataset:
//! - Scalar value model with null-collapsing normalization
//! - Feature indexing by key field
//! - Per-field and geometry difference detection
//! - New/modified classification
//! - Human-readable report rendering
//! - Transactional update executor with backup-before-write
//!
//! Storage is abstracted behind the [`Dataset`] trait; an in-memory provider
//! lives here and a SQLite-backed one in `layersync-store`.

pub mod classify;
pub mod dataset;
pub mod diff;
pub mod errors;
pub mod index;
pub mod logging_facility;
pub mod model;
pub mod normalize;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod update;

// Re-export commonly used types
pub use classify::{classify, Classification, ModifiedEntry};
pub use dataset::{Dataset, EditSession, MemoryDataset};
pub use diff::{compare, DifferenceSet, FieldChange};
pub use errors::{Result, SyncError, SyncErrorKind};
pub use index::FeatureIndex;
pub use model::{FieldDef, FieldType, FieldValue, Record, RecordId, Schema};
pub use normalize::{normalize, NormalizedValue};
pub use progress::{CaptureProgress, NullProgress, ProgressSink, TracingProgress};
pub use reconcile::{reconcile, ReconcileOptions, ReconcileOutcome};
pub use report::{render_report, render_update_report};
pub use update::{apply, ItemOutcome, UpdateOutcome, UpdateReport};
