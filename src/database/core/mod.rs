//! Core database infrastructure
//!
//! This module provides the foundational database components used by the record store:
//! - `DatabaseConn`: SQLite connection wrapper with the statement primitives
//! - `Ident`, `Value`: the identifier and bound-value halves of every statement
//! - `Filters`, `GetAllQuery`: filter compilation and listing queries
//! - `SchemaMigrator`: table creation and column additions from a schema catalog

mod connection;
mod filters;
mod ident;
mod query;
mod schema;
mod value;

pub use connection::DatabaseConn;
pub use filters::{Condition, Filters, Operator, WhereClause};
pub use ident::{join_idents, Ident};
pub use query::{BuiltQuery, GetAllQuery, SortOrder, DEFAULT_ORDER_BY};
pub use schema::{
    column_definitions, ColumnDefinition, MigrationReport, SchemaMigrator, TablePlan,
    TableStatus,
};
pub use value::{record, Record, Value};
