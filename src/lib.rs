#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Recordkit - a schema-driven record store on SQLite
//!
//! Recordkit persists typed records described by a schema catalog. Every
//! record type maps to one table whose columns follow the type's fields; the
//! store creates and extends those tables, and offers get/insert/update/delete,
//! filtered listings and single-value lookups on top of them. It can be used as
//! both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Schema catalog, migrations and record operations | `rusqlite` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | Command-line binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! recordkit = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! recordkit = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`schema`]**: Field types, their SQL column types, record type schemas
//!   and the catalog holding them
//! - **[`database`]**: Connection, migrations, filter and query building, and
//!   the [`RecordDatabase`] record store
//! - **[`config`]**: Configuration management
//! - **[`utils`]**: Output formats shared by the commands
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use recordkit::database::{record, Filters, GetAllQuery, Operator, RecordDatabase};
//! use recordkit::schema::SchemaCatalog;
//!
//! let catalog = SchemaCatalog::from_json_file("schema.json")?;
//! let db = RecordDatabase::open("records.sqlite3", catalog)?;
//! db.migrate()?;
//!
//! db.insert("Item", &record([("name", "ITEM-001"), ("item_name", "Apple")]))?;
//! db.commit()?;
//!
//! let apples = db.get_all(
//!     &GetAllQuery::new("Item")
//!         .filters(Filters::new().with("item_name", Operator::Like, "apple"))
//!         .limit(10),
//! )?;
//!
//! let name = db.get_value("Item", "ITEM-001", Some("item_name"))?;
//! ```

pub mod config;
pub mod database;
pub mod schema;
pub mod utils;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, RecordkitConfig};

// =============================================================================
// Record store and building blocks
// =============================================================================

pub use database::RecordDatabase;

pub use database::{
    DatabaseConn, Filters, GetAllQuery, MigrationReport, Operator, Record, SortOrder, Value,
};

pub use schema::{FieldDefinition, FieldType, RecordTypeSchema, SchemaCatalog, SqlType};

pub use utils::OutputFormat;
