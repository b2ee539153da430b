//! Database module
//!
//! This module provides all database functionality for recordkit, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connection, identifiers,
//!   values, filters, listing queries, migrations)
//! - **store**: The record store tying a connection to a schema catalog
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper
//! │   ├── ident       # Validated table/column identifiers
//! │   ├── value       # Bound values and records
//! │   ├── filters     # Filter specifications -> WHERE clauses
//! │   ├── query       # Listing queries (fields, order, paging)
//! │   └── schema      # Table creation and additive migrations
//! │
//! └── store           # RecordDatabase: CRUD over the catalog
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use recordkit::database::{Filters, GetAllQuery, RecordDatabase};
//! use recordkit::schema::SchemaCatalog;
//!
//! let catalog = SchemaCatalog::from_json_file("schema.json")?;
//! let db = RecordDatabase::open_in_dir("~/.recordkit", catalog)?;
//!
//! // Create missing tables and columns
//! let report = db.migrate()?;
//! println!("{} tables created", report.created.len());
//!
//! // List open items, oldest first
//! let query = GetAllQuery::new("Item")
//!     .filters(Filters::new().eq("status", "Open"))
//!     .order(SortOrder::Asc);
//! for item in db.get_all(&query)? {
//!     println!("{:?}", item);
//! }
//! ```

pub mod core;
mod store;

// SQLite connection and migrations
pub use core::{
    column_definitions, ColumnDefinition, DatabaseConn, MigrationReport, SchemaMigrator,
    TablePlan, TableStatus,
};

// Statement building blocks
pub use core::{
    join_idents, record, BuiltQuery, Condition, Filters, GetAllQuery, Ident, Operator, Record,
    SortOrder, Value, WhereClause, DEFAULT_ORDER_BY,
};

// Record store (main entry point)
pub use store::{RecordDatabase, DATABASE_FILE_NAME};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
