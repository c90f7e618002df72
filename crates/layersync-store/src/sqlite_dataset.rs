//! SQLite-backed dataset provider.
//!
//! One table per dataset: attribute columns typed by affinity plus a `geom`
//! column holding WKT text. Record identifiers map to SQLite rowids. The
//! edit session is an explicit SQL transaction.

#![allow(clippy::result_large_err)]

use geo_types::Geometry;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use layersync_core::{
    Dataset, FieldDef, FieldType, FieldValue, Record, RecordId, Schema, SyncError, SyncErrorKind,
};

use crate::db;
use crate::errors::{commit_rejected, from_rusqlite, Result};
use crate::geometry::{parse_wkt, to_wkt};

/// Name of the WKT geometry column. Not part of the attribute schema.
const GEOMETRY_COLUMN: &str = "geom";

/// A dataset stored in a single SQLite table.
pub struct SqliteDataset {
    conn: Connection,
    path: Option<PathBuf>,
    table: String,
    schema: Arc<Schema>,
    editing: bool,
}

impl SqliteDataset {
    /// Create a new table for `schema` in a database file at `path`.
    pub fn create(path: &Path, table: &str, schema: &Schema) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        create_table(&conn, table, schema)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            table: table.to_string(),
            schema: Arc::new(schema.clone()),
            editing: false,
        })
    }

    /// Open an existing table, deriving the schema from the database.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        let schema = read_schema(&conn, table)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            table: table.to_string(),
            schema: Arc::new(schema),
            editing: false,
        })
    }

    /// Create a table in an in-memory database (for testing). Not
    /// file-backed: `storage_path` is `None` and backup is skipped.
    pub fn open_in_memory(table: &str, schema: &Schema) -> Result<Self> {
        let conn = db::open_in_memory()?;
        create_table(&conn, table, schema)?;
        Ok(Self {
            conn,
            path: None,
            table: table.to_string(),
            schema: Arc::new(schema.clone()),
            editing: false,
        })
    }

    /// Insert a record directly, outside any edit session.
    ///
    /// Fixture and import seeding only; reconciliation mutations go through
    /// the edit session protocol.
    pub fn insert(&mut self, record: &Record) -> Result<RecordId> {
        self.insert_row(record)
    }

    fn insert_row(&mut self, record: &Record) -> Result<RecordId> {
        let mut columns: Vec<String> = Vec::with_capacity(self.schema.len() + 1);
        let mut params: Vec<Value> = Vec::with_capacity(self.schema.len() + 1);
        for def in self.schema.fields() {
            columns.push(quote_ident(&def.name));
            let value = record.field(&def.name).cloned().unwrap_or(FieldValue::Null);
            params.push(to_sql_value(&value));
        }
        columns.push(quote_ident(GEOMETRY_COLUMN));
        params.push(match record.geometry() {
            Some(geometry) => Value::Text(to_wkt(geometry)),
            None => Value::Null,
        });

        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn
            .execute(&sql, rusqlite::params_from_iter(params))
            .map_err(from_rusqlite)?;
        Ok(RecordId(self.conn.last_insert_rowid()))
    }

    fn select_sql(&self, filter: Option<&str>) -> String {
        let mut columns: Vec<String> = vec!["rowid".to_string()];
        columns.extend(self.schema.fields().iter().map(|def| quote_ident(&def.name)));
        columns.push(quote_ident(GEOMETRY_COLUMN));
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(&self.table)
        );
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        sql.push_str(" ORDER BY rowid");
        sql
    }

    fn rows_to_records(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let schema = Arc::clone(&self.schema);
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let id: i64 = row.get(0)?;
                let mut values = Vec::with_capacity(schema.len());
                for (i, def) in schema.fields().iter().enumerate() {
                    values.push(field_value_from_ref(row.get_ref(i + 1)?, def.field_type));
                }
                let geom_text: Option<String> = row.get(schema.len() + 1)?;
                Ok((id, values, geom_text))
            })
            .map_err(from_rusqlite)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, values, geom_text) = row.map_err(from_rusqlite)?;
            let geometry = geom_text.and_then(|text| decode_geometry(&text, id));
            records.push(Record::with_values(
                RecordId(id),
                Arc::clone(&self.schema),
                values,
                geometry,
            ));
        }
        Ok(records)
    }

    fn require_editing(&self, op: &str) -> Result<()> {
        if self.editing {
            Ok(())
        } else {
            Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op(op)
                .with_message("dataset is not in edit mode"))
        }
    }

    fn require_field(&self, op: &str, field: &str) -> Result<()> {
        if self.schema.contains(field) {
            Ok(())
        } else {
            Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op(op)
                .with_field(field)
                .with_message("no such field in schema"))
        }
    }
}

impl Dataset for SqliteDataset {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn records(&self) -> Result<Vec<Record>> {
        self.rows_to_records(&self.select_sql(None), &[])
    }

    fn storage_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn is_editing(&self) -> bool {
        self.editing
    }

    fn begin_edit(&mut self) -> Result<()> {
        if self.editing {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("begin_edit")
                .with_message("an edit session is already open"));
        }
        self.conn.execute_batch("BEGIN").map_err(from_rusqlite)?;
        self.editing = true;
        Ok(())
    }

    fn add_record(&mut self, record: &Record) -> Result<RecordId> {
        self.require_editing("add_record")?;
        self.insert_row(record)
    }

    fn change_field_value(
        &mut self,
        id: RecordId,
        field: &str,
        value: &FieldValue,
    ) -> Result<()> {
        self.require_editing("change_field_value")?;
        self.require_field("change_field_value", field)?;
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE rowid = ?2",
            quote_ident(&self.table),
            quote_ident(field)
        );
        let changed = self
            .conn
            .execute(&sql, rusqlite::params![to_sql_value(value), id.0])
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("change_field_value")
                .with_message(format!("no record with id {}", id.0)));
        }
        Ok(())
    }

    fn change_geometry(&mut self, id: RecordId, geometry: &Geometry<f64>) -> Result<()> {
        self.require_editing("change_geometry")?;
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE rowid = ?2",
            quote_ident(&self.table),
            quote_ident(GEOMETRY_COLUMN)
        );
        let changed = self
            .conn
            .execute(&sql, rusqlite::params![to_wkt(geometry), id.0])
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(SyncError::new(SyncErrorKind::Persistence)
                .with_op("change_geometry")
                .with_message(format!("no record with id {}", id.0)));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.require_editing("commit")?;
        match self.conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.editing = false;
                Ok(())
            }
            Err(e) => {
                // Some commit failures leave SQLite back in autocommit with
                // the transaction already undone; track that so rollback
                // becomes a no-op.
                if self.conn.is_autocommit() {
                    self.editing = false;
                }
                Err(commit_rejected(e))
            }
        }
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.editing {
            return Ok(());
        }
        let result = self.conn.execute_batch("ROLLBACK");
        self.editing = false;
        match result {
            Ok(()) => Ok(()),
            // Transaction already gone (auto-rollback on a prior error)
            Err(_) if self.conn.is_autocommit() => Ok(()),
            Err(e) => Err(from_rusqlite(e)),
        }
    }

    fn reload(&mut self) -> Result<()> {
        self.schema = Arc::new(read_schema(&self.conn, &self.table)?);
        Ok(())
    }

    fn find_by_key(&self, field: &str, key_text: &str) -> Result<Vec<Record>> {
        self.require_field("find_by_key", field)?;
        let filter = format!("CAST({} AS TEXT) = ?1", quote_ident(field));
        self.rows_to_records(
            &self.select_sql(Some(&filter)),
            &[Value::Text(key_text.to_string())],
        )
    }
}

/// Quote an SQL identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn decl_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "TEXT",
        FieldType::Integer => "INTEGER",
        FieldType::Real => "REAL",
        FieldType::Bool => "BOOLEAN",
    }
}

fn field_type_from_decl(decl: &str) -> FieldType {
    let upper = decl.to_uppercase();
    if upper.contains("BOOL") {
        FieldType::Bool
    } else if upper.contains("INT") {
        FieldType::Integer
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        FieldType::Real
    } else {
        FieldType::Text
    }
}

fn create_table(conn: &Connection, table: &str, schema: &Schema) -> Result<()> {
    let mut columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|def| format!("{} {}", quote_ident(&def.name), decl_type(def.field_type)))
        .collect();
    columns.push(format!("{} TEXT", quote_ident(GEOMETRY_COLUMN)));
    let sql = format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        columns.join(", ")
    );
    conn.execute(&sql, []).map_err(from_rusqlite)?;
    Ok(())
}

fn read_schema(conn: &Connection, table: &str) -> Result<Schema> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let decl: String = row.get(2)?;
            Ok((name, decl))
        })
        .map_err(from_rusqlite)?;

    let mut fields = Vec::new();
    for row in rows {
        let (name, decl) = row.map_err(from_rusqlite)?;
        if name == GEOMETRY_COLUMN {
            continue;
        }
        fields.push(FieldDef::new(name, field_type_from_decl(&decl)));
    }

    if fields.is_empty() {
        return Err(SyncError::new(SyncErrorKind::Persistence)
            .with_op("read_schema")
            .with_message(format!("table {} not found or has no columns", table)));
    }
    Ok(Schema::new(fields))
}

fn field_value_from_ref(value: ValueRef<'_>, field_type: FieldType) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => match field_type {
            FieldType::Bool => FieldValue::Bool(i != 0),
            _ => FieldValue::Integer(i),
        },
        ValueRef::Real(r) => FieldValue::Real(r),
        ValueRef::Text(t) => FieldValue::Text(String::from_utf8_lossy(t).into_owned()),
        // Blobs are outside the scalar model
        ValueRef::Blob(_) => FieldValue::Null,
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Real(r) => Value::Real(*r),
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
    }
}

/// Decode the geometry column, tolerating bad WKT: a record with an
/// unparseable geometry loads without one, consistent with invalid
/// geometries being silently skipped during comparison.
fn decode_geometry(text: &str, rowid: i64) -> Option<Geometry<f64>> {
    match parse_wkt(text) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            tracing::warn!(rowid, error = %e, "unparseable geometry, loading record without it");
            None
        }
    }
}
