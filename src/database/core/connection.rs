//! Database connection management
//!
//! This module provides the single connection handle every record store
//! operation goes through, plus the low-level statement primitives.

use anyhow::{anyhow, Result};
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, error};

use super::ident::Ident;
use super::value::{Record, Value};

/// Primary result code SQLite reports for a COMMIT outside a transaction
const SQLITE_GENERIC_ERROR: i32 = 1;

/// Core database connection wrapper
///
/// `DatabaseConn` owns one SQLite connection, either file-based or
/// in-memory. Statements run in the order they are issued; the handle is
/// not meant to be shared between threads.
pub struct DatabaseConn {
    pub conn: Connection,
    path: Option<String>,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = Self::connect(path)?;
        let db = DatabaseConn {
            conn,
            path: path.map(str::to_string),
        };
        db.configure()?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    fn connect(path: Option<&str>) -> Result<Connection> {
        match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e)),
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e)),
        }
    }

    /// Point this handle at another database
    ///
    /// The current connection is closed first. Reopening the same path is
    /// allowed and simply yields a fresh connection.
    pub fn reopen(&mut self, path: Option<&str>) -> Result<()> {
        let conn = Self::connect(path)?;
        let old = std::mem::replace(&mut self.conn, conn);
        self.path = path.map(str::to_string);
        if let Err((_, e)) = old.close() {
            debug!("Error closing previous connection: {}", e);
        }
        self.configure()
    }

    /// Path of the open database, `None` for in-memory
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Configure the database with the settings used by the record store
    fn configure(&self) -> Result<()> {
        // WAL for file databases; in-memory databases report "memory" here
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        Ok(())
    }

    /// Execute a statement that does not return rows
    ///
    /// Used for DDL, INSERT, UPDATE and DELETE. Failures are logged and
    /// returned to the caller.
    pub fn run(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(sql, params = params.len(), "run");
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(|e| {
                error!("Statement failed: {}: {}", sql, e);
                anyhow!("Failed to execute SQL: {}", e)
            })
    }

    /// Execute a statement that returns rows
    ///
    /// Each row becomes a record keyed by column name.
    pub fn sql(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        debug!(sql, params = params.len(), "query");
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let mut record = Record::new();
                for (idx, column) in columns.iter().enumerate() {
                    record.insert(column.clone(), row.get::<_, Value>(idx)?);
                }
                Ok(record)
            })
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read query results: {}", e))
    }

    /// Start an explicit transaction
    pub fn begin(&self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))
    }

    /// Commit the current transaction
    ///
    /// Committing when no transaction is active is not an error; any other
    /// failure is returned.
    pub fn commit(&self) -> Result<()> {
        match self.conn.execute_batch("COMMIT") {
            Ok(()) => Ok(()),
            Err(e) if is_no_active_transaction(&e) => {
                debug!("Commit skipped: no active transaction");
                Ok(())
            }
            Err(e) => {
                error!("Commit failed: {}", e);
                Err(anyhow!("Failed to commit transaction: {}", e))
            }
        }
    }

    /// Whether a transaction is open on this connection
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Column names of a table, in table order
    pub fn table_columns(&self, table_name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|e| anyhow!("Failed to read columns of '{}': {}", table_name, e))?;
        let names = stmt
            .query_map([table_name], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| anyhow!("Failed to read columns of '{}': {}", table_name, e))?;
        Ok(names)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &Ident) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count)
    }

    /// Close the connection
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow!("Failed to close database: {}", e))
    }
}

fn is_no_active_transaction(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            err.extended_code == SQLITE_GENERIC_ERROR
                && msg
                    .as_deref()
                    .map(|m| m.contains("no transaction is active"))
                    .unwrap_or(false)
        }
        _ => false,
    }
}
