//! LayerSync Store - SQLite-backed dataset provider
//!
//! Implements the `layersync-core` [`Dataset`](layersync_core::Dataset)
//! trait over a single SQLite table: attribute columns typed by affinity,
//! geometry as WKT text, edit sessions as SQL transactions.

pub mod db;
pub mod errors;
pub mod geometry;
pub mod sqlite_dataset;

pub use sqlite_dataset::SqliteDataset;
