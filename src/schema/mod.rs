//! Record type schemas
//!
//! This module describes what gets persisted:
//! - `FieldType` / `SqlType`: abstract field types and their column mapping
//! - `FieldDefinition`, `RecordTypeSchema`: per-type field lists
//! - `SchemaCatalog`: the set of record types handed to the database
//! - `slug`: record type name to table name

mod catalog;
mod field_type;

pub use catalog::{
    slug, FieldDefinition, RecordTypeSchema, SchemaCatalog, PRIMARY_KEY_FIELD,
};
pub use field_type::{FieldType, SqlType};
