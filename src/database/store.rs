//! Record store
//!
//! `RecordDatabase` ties one connection to one schema catalog and exposes the
//! record operations: migration, get/insert/update/delete, filtered listings
//! and single-value lookups. Every read goes to the database; nothing is
//! cached.

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::database::core::{
    join_idents, DatabaseConn, Filters, GetAllQuery, Ident, MigrationReport, Record,
    SchemaMigrator, TablePlan, Value,
};
use crate::schema::{RecordTypeSchema, SchemaCatalog, PRIMARY_KEY_FIELD};

/// Default database file name inside a data directory
pub const DATABASE_FILE_NAME: &str = "recordkit.sqlite3";

/// Schema-driven record store (SQLite backend)
///
/// # Example
///
/// ```rust,ignore
/// use recordkit::database::{Filters, GetAllQuery, RecordDatabase};
///
/// let db = RecordDatabase::open("data.sqlite3", catalog)?;
/// db.migrate()?;
///
/// db.insert("Item", &record([("name", "ITEM-001"), ("item_name", "Apple")]))?;
/// let item = db.get("Item", "ITEM-001", None)?;
/// let open = db.get_all(&GetAllQuery::new("Item").filters(Filters::new().eq("status", "Open")))?;
/// ```
pub struct RecordDatabase {
    db: DatabaseConn,
    catalog: SchemaCatalog,
}

impl RecordDatabase {
    /// Open the record store at the specified path
    ///
    /// Tables are not touched until `migrate` is called.
    pub fn open(path: &str, catalog: SchemaCatalog) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        info!(
            "Opened record database at '{}' ({} record types)",
            path,
            catalog.len()
        );
        Ok(Self { db, catalog })
    }

    /// Open the record store from a data directory
    ///
    /// Uses the standard database file path: `{data_dir}/recordkit.sqlite3`
    pub fn open_in_dir(data_dir: &str, catalog: SchemaCatalog) -> Result<Self> {
        let path = format!("{}/{}", data_dir.trim_end_matches('/'), DATABASE_FILE_NAME);
        Self::open(&path, catalog)
    }

    /// Create an in-memory record store (for testing)
    pub fn open_in_memory(catalog: SchemaCatalog) -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        Ok(Self { db, catalog })
    }

    /// Switch to another database file
    pub fn connect(&mut self, path: &str) -> Result<()> {
        self.db.reopen(Some(path))?;
        info!("Reconnected record database to '{}'", path);
        Ok(())
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        self.db.close()
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Get the underlying database connection (for advanced queries)
    pub fn connection(&self) -> &DatabaseConn {
        &self.db
    }

    /// Create or extend the table of every record type
    pub fn migrate(&self) -> Result<MigrationReport> {
        SchemaMigrator::new(&self.db, &self.catalog).migrate()
    }

    /// What `migrate` would change, without changing it
    pub fn plan(&self) -> Result<Vec<TablePlan>> {
        SchemaMigrator::new(&self.db, &self.catalog).plan()
    }

    /// Start an explicit transaction
    pub fn begin(&self) -> Result<()> {
        self.db.begin()
    }

    /// Commit, tolerating the absence of an open transaction
    pub fn commit(&self) -> Result<()> {
        self.db.commit()
    }

    fn schema(&self, record_type: &str) -> Result<&RecordTypeSchema> {
        self.catalog.schema(record_type)
    }

    /// Fetch one record by primary key
    ///
    /// `fields` of `None` returns every column. An empty record is returned
    /// when nothing matches.
    pub fn get(&self, record_type: &str, id: &str, fields: Option<&[&str]>) -> Result<Record> {
        let schema = self.schema(record_type)?;
        let table = schema.table_name()?;
        let columns = match fields {
            Some(fields) if !fields.is_empty() => {
                let idents = fields
                    .iter()
                    .map(|f| schema.column(f))
                    .collect::<Result<Vec<Ident>>>()?;
                join_idents(&idents)
            }
            _ => "*".to_string(),
        };

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? LIMIT 1",
            columns,
            table,
            primary_key()?
        );
        let mut rows = self
            .db
            .sql(&sql, &[Value::from(id)])
            .map_err(|e| anyhow!("Failed to get '{}' record '{}': {}", record_type, id, e))?;

        Ok(rows.pop().unwrap_or_default())
    }

    /// Insert a record
    ///
    /// Every key must be a persisted field of the record type. Values are
    /// bound in key order.
    pub fn insert(&self, record_type: &str, record: &Record) -> Result<()> {
        let schema = self.schema(record_type)?;
        let table = schema.table_name()?;
        let (columns, values) = resolve_record(schema, record)?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            join_idents(&columns),
            placeholders
        );

        self.db
            .run(&sql, &values)
            .map_err(|e| anyhow!("Failed to insert '{}' record: {}", record_type, e))?;
        debug!("Inserted '{}' record", record_type);
        Ok(())
    }

    /// Update a record identified by its `name` field
    ///
    /// Returns the number of rows changed, zero when no record has that name.
    pub fn update(&self, record_type: &str, record: &Record) -> Result<usize> {
        let schema = self.schema(record_type)?;
        let table = schema.table_name()?;
        let id = record
            .get(PRIMARY_KEY_FIELD)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "Cannot update '{}' record without a '{}' value",
                    record_type,
                    PRIMARY_KEY_FIELD
                )
            })?;

        let (columns, mut values) = resolve_record(schema, record)?;
        let assignments = columns
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        values.push(id);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table,
            assignments,
            primary_key()?
        );

        self.db
            .run(&sql, &values)
            .map_err(|e| anyhow!("Failed to update '{}' record: {}", record_type, e))
    }

    /// Delete a record by primary key
    ///
    /// Returns the number of rows removed.
    pub fn delete(&self, record_type: &str, id: &str) -> Result<usize> {
        let schema = self.schema(record_type)?;
        let table = schema.table_name()?;
        let sql = format!("DELETE FROM {} WHERE {} = ?", table, primary_key()?);

        self.db
            .run(&sql, &[Value::from(id)])
            .map_err(|e| anyhow!("Failed to delete '{}' record '{}': {}", record_type, id, e))
    }

    /// List records matching a query
    pub fn get_all(&self, query: &GetAllQuery) -> Result<Vec<Record>> {
        let schema = self.schema(&query.record_type)?;
        let built = query.build(schema)?;

        self.db
            .sql(&built.sql, &built.params)
            .map_err(|e| anyhow!("Failed to list '{}' records: {}", query.record_type, e))
    }

    /// Value of one field of the first matching record
    ///
    /// `filters` can be a bare id (`"ITEM-001"`) or a full filter
    /// specification. `field` defaults to `name`. Returns `None` when no
    /// record matches.
    pub fn get_value(
        &self,
        record_type: &str,
        filters: impl Into<Filters>,
        field: Option<&str>,
    ) -> Result<Option<Value>> {
        let field = field.unwrap_or(PRIMARY_KEY_FIELD);
        let query = GetAllQuery::new(record_type)
            .fields(&[field])
            .filters(filters.into())
            .start(0)
            .limit(1);

        Ok(self
            .get_all(&query)?
            .into_iter()
            .next()
            .and_then(|mut row| row.remove(field)))
    }

    /// Whether a record with this primary key exists
    pub fn exists(&self, record_type: &str, id: &str) -> Result<bool> {
        Ok(self.get_value(record_type, id, None)?.is_some())
    }

    /// Number of records matching `filters`
    pub fn count(&self, record_type: &str, filters: &Filters) -> Result<u64> {
        let schema = self.schema(record_type)?;
        let built = GetAllQuery::new(record_type)
            .filters(filters.clone())
            .build_count(schema)?;

        let rows = self
            .db
            .sql(&built.sql, &built.params)
            .map_err(|e| anyhow!("Failed to count '{}' records: {}", record_type, e))?;

        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }
}

fn primary_key() -> Result<Ident> {
    Ident::new(PRIMARY_KEY_FIELD)
}

/// Split a record into column identifiers and values, checked against the schema
fn resolve_record(schema: &RecordTypeSchema, record: &Record) -> Result<(Vec<Ident>, Vec<Value>)> {
    if record.is_empty() {
        return Err(anyhow!("Empty '{}' record", schema.name));
    }

    let mut columns = Vec::with_capacity(record.len());
    let mut values = Vec::with_capacity(record.len());
    for (field, value) in record {
        columns.push(schema.column(field)?);
        values.push(value.clone());
    }
    Ok((columns, values))
}
