//! Database schema management
//!
//! Reconciles live tables with the schema catalog. Each record type gets a
//! table named after its slug and one column per persisted field. Tables are
//! only ever created or extended: existing columns are never dropped or
//! retyped, and migration state is read from the SQLite catalog rather than
//! tracked in a separate table.

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use super::connection::DatabaseConn;
use super::ident::Ident;
use crate::schema::{
    FieldDefinition, RecordTypeSchema, SchemaCatalog, SqlType, PRIMARY_KEY_FIELD,
};

/// Column derived from a persisted field definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Ident,
    pub sql_type: SqlType,
    pub not_null: bool,
    pub primary_key: bool,
    /// Default rendered as a SQL literal
    pub default: Option<String>,
}

impl ColumnDefinition {
    /// Derive the column for a field, `None` for fields without a column type
    pub fn from_field(field: &FieldDefinition) -> Result<Option<Self>> {
        let Some(sql_type) = field.sql_type() else {
            return Ok(None);
        };

        Ok(Some(ColumnDefinition {
            name: Ident::new(&field.name)?,
            sql_type,
            not_null: field.required,
            primary_key: field.name == PRIMARY_KEY_FIELD,
            default: field.default_value().map(|v| v.to_sql_literal()),
        }))
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Column clause: `<name> <type> [PRIMARY KEY] [NOT NULL] [DEFAULT <literal>]`
    pub fn to_sql(&self) -> String {
        let mut clause = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            clause.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            clause.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            clause.push_str(" DEFAULT ");
            clause.push_str(default);
        }
        clause
    }

    /// Variant of this column that `ALTER TABLE ... ADD COLUMN` accepts
    ///
    /// SQLite cannot add a primary key column, nor a NOT NULL column without
    /// a default, to an existing table.
    fn for_alter(&self) -> ColumnDefinition {
        let mut column = self.clone();
        column.primary_key = false;
        if column.not_null && !column.has_default() {
            column.not_null = false;
        }
        column
    }
}

/// Columns for every persisted field of a record type, in field order
pub fn column_definitions(schema: &RecordTypeSchema) -> Result<Vec<ColumnDefinition>> {
    let mut columns = Vec::new();
    for field in &schema.fields {
        match ColumnDefinition::from_field(field) {
            Ok(Some(column)) => columns.push(column),
            Ok(None) => debug!(
                "Skipping field '{}' of '{}': type {} has no column",
                field.name, schema.name, field.field_type
            ),
            Err(e) => {
                return Err(anyhow!(
                    "Invalid field '{}' in record type '{}': {}",
                    field.name,
                    schema.name,
                    e
                ))
            }
        }
    }
    Ok(columns)
}

/// State of one record type's table relative to its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// Table does not exist yet
    Missing,

    /// Table has every persisted field
    Current,

    /// Table exists but lacks these columns
    MissingColumns(Vec<String>),
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableStatus::Missing => write!(f, "missing"),
            TableStatus::Current => write!(f, "current"),
            TableStatus::MissingColumns(columns) => {
                write!(f, "missing columns: {}", columns.join(", "))
            }
        }
    }
}

/// Planned or applied change for one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub record_type: String,
    pub table: String,
    pub status: TableStatus,
}

/// What a migration pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Tables created
    pub created: Vec<String>,
    /// Tables extended, with the columns added
    pub altered: Vec<(String, Vec<String>)>,
    /// Tables already matching their schema
    pub unchanged: Vec<String>,
}

impl MigrationReport {
    /// True when the pass issued no DDL
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.altered.is_empty()
    }

    /// Number of columns added to existing tables
    pub fn columns_added(&self) -> usize {
        self.altered.iter().map(|(_, cols)| cols.len()).sum()
    }
}

/// Schema migrator
///
/// Brings the tables of a database in line with a schema catalog.
pub struct SchemaMigrator<'a> {
    db: &'a DatabaseConn,
    catalog: &'a SchemaCatalog,
}

impl<'a> SchemaMigrator<'a> {
    /// Create a new migrator for the given connection and catalog
    pub fn new(db: &'a DatabaseConn, catalog: &'a SchemaCatalog) -> Self {
        Self { db, catalog }
    }

    /// Create or extend the table of every record type, then commit
    ///
    /// Record types run one after another. A failing statement stops the
    /// pass; tables handled before it stay migrated.
    pub fn migrate(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        for schema in self.tabled_types() {
            let table = schema.table_name()?.as_str().to_string();
            if self.table_exists(schema)? {
                let added = self.alter_table(schema)?;
                if added.is_empty() {
                    report.unchanged.push(table);
                } else {
                    report.altered.push((table, added));
                }
            } else {
                self.create_table(schema)?;
                report.created.push(table);
            }
        }

        self.db.commit()?;

        info!(
            "Migration finished: {} created, {} altered ({} columns), {} unchanged",
            report.created.len(),
            report.altered.len(),
            report.columns_added(),
            report.unchanged.len()
        );
        Ok(report)
    }

    /// Compute what `migrate` would do without changing anything
    pub fn plan(&self) -> Result<Vec<TablePlan>> {
        self.tabled_types()
            .map(|schema| {
                Ok(TablePlan {
                    record_type: schema.name.clone(),
                    table: schema.table_name()?.as_str().to_string(),
                    status: self.check_status(schema)?,
                })
            })
            .collect()
    }

    /// Record types that get a table; the rest are logged and passed over
    fn tabled_types(&self) -> impl Iterator<Item = &'a RecordTypeSchema> {
        let catalog = self.catalog;
        catalog.record_types.iter().filter(|schema| {
            let keep = schema.persisted_fields().next().is_some();
            if !keep {
                debug!(
                    "Skipping record type '{}': no persisted fields",
                    schema.name
                );
            }
            keep
        })
    }

    /// Check one record type's table against its schema
    pub fn check_status(&self, schema: &RecordTypeSchema) -> Result<TableStatus> {
        if !self.table_exists(schema)? {
            return Ok(TableStatus::Missing);
        }

        let missing: Vec<String> = self
            .missing_columns(schema)?
            .into_iter()
            .map(|c| c.name.as_str().to_string())
            .collect();

        if missing.is_empty() {
            Ok(TableStatus::Current)
        } else {
            Ok(TableStatus::MissingColumns(missing))
        }
    }

    /// Whether the record type's table exists
    pub fn table_exists(&self, schema: &RecordTypeSchema) -> Result<bool> {
        let table = schema.table_name()?;
        self.db.table_exists(table.as_str())
    }

    /// Create the record type's table
    pub fn create_table(&self, schema: &RecordTypeSchema) -> Result<()> {
        let table = schema.table_name()?;
        let columns = column_definitions(schema)?;

        if columns.is_empty() {
            return Err(anyhow!(
                "Record type '{}' has no persisted fields to create table '{}' from",
                schema.name,
                table.as_str()
            ));
        }

        let clauses: Vec<String> = columns.iter().map(ColumnDefinition::to_sql).collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table,
            clauses.join(", ")
        );

        self.db.run(&sql, &[]).map_err(|e| {
            anyhow!(
                "Failed to create table for '{}' ({}): {}",
                schema.name,
                table.as_str(),
                e
            )
        })?;

        info!("Created table '{}' for '{}'", table.as_str(), schema.name);
        Ok(())
    }

    /// Add every missing column to the record type's table
    ///
    /// Returns the names of the columns added. One statement per column.
    pub fn alter_table(&self, schema: &RecordTypeSchema) -> Result<Vec<String>> {
        let table = schema.table_name()?;
        let mut added = Vec::new();

        for column in self.missing_columns(schema)? {
            if column.not_null && !column.has_default() {
                warn!(
                    "Column '{}' of '{}' is required but has no default; adding it as nullable",
                    column.name.as_str(),
                    table.as_str()
                );
            }
            let column = column.for_alter();

            let sql = format!("ALTER TABLE {} ADD COLUMN {}", table, column.to_sql());
            self.db.run(&sql, &[]).map_err(|e| {
                anyhow!(
                    "Failed to add column '{}' to '{}' ({}): {}",
                    column.name.as_str(),
                    schema.name,
                    table.as_str(),
                    e
                )
            })?;

            info!("Added column '{}' to '{}'", column.name.as_str(), table.as_str());
            added.push(column.name.as_str().to_string());
        }

        Ok(added)
    }

    /// Persisted fields that have no column in the existing table
    fn missing_columns(&self, schema: &RecordTypeSchema) -> Result<Vec<ColumnDefinition>> {
        let table = schema.table_name()?;
        let existing = self.db.table_columns(table.as_str())?;

        Ok(column_definitions(schema)?
            .into_iter()
            .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(c.name.as_str())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::value::Value;
    use crate::schema::FieldType;

    fn item_schema() -> RecordTypeSchema {
        RecordTypeSchema::new("Item")
            .field(FieldDefinition::new("name", FieldType::Data).required())
            .field(FieldDefinition::new("item_name", FieldType::Data))
            .field(FieldDefinition::new("details", FieldType::SectionBreak))
            .field(FieldDefinition::new("rate", FieldType::Currency).with_default(0.0))
            .field(
                FieldDefinition::new("status", FieldType::Select)
                    .required()
                    .with_default("Open"),
            )
            .field(FieldDefinition::new("modified", FieldType::Datetime))
    }

    fn catalog(schemas: Vec<RecordTypeSchema>) -> SchemaCatalog {
        schemas
            .into_iter()
            .fold(SchemaCatalog::new(), |c, s| c.with(s))
    }

    #[test]
    fn test_column_clause() {
        let columns = column_definitions(&item_schema()).unwrap();
        let clauses: Vec<String> = columns.iter().map(ColumnDefinition::to_sql).collect();
        assert_eq!(
            clauses,
            vec![
                r#""name" TEXT PRIMARY KEY NOT NULL"#,
                r#""item_name" TEXT"#,
                r#""rate" REAL DEFAULT 0.0"#,
                r#""status" TEXT NOT NULL DEFAULT 'Open'"#,
                r#""modified" TEXT"#,
            ]
        );
    }

    #[test]
    fn test_invalid_field_name_rejected() {
        let schema = RecordTypeSchema::new("Bad")
            .field(FieldDefinition::new("name", FieldType::Data))
            .field(FieldDefinition::new("drop table", FieldType::Data));
        assert!(column_definitions(&schema).is_err());
    }

    #[test]
    fn test_migrate_creates_tables() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let catalog = catalog(vec![item_schema(), RecordTypeSchema::new("Desk")]);
        let migrator = SchemaMigrator::new(&db, &catalog);

        let report = migrator.migrate().unwrap();
        assert_eq!(report.created, vec!["item"]);
        assert!(db.table_exists("item").unwrap());
        // types without fields are skipped
        assert!(!db.table_exists("desk").unwrap());
        assert_eq!(
            db.table_columns("item").unwrap(),
            vec!["name", "item_name", "rate", "status", "modified"]
        );
    }

    #[test]
    fn test_defaults_applied() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let catalog = catalog(vec![item_schema()]);
        SchemaMigrator::new(&db, &catalog).migrate().unwrap();

        db.run("INSERT INTO item (name) VALUES (?)", &[Value::from("A")])
            .unwrap();
        let rows = db
            .sql("SELECT rate, status FROM item WHERE name = ?", &[Value::from("A")])
            .unwrap();
        assert_eq!(rows[0]["rate"], Value::Real(0.0));
        assert_eq!(rows[0]["status"], Value::from("Open"));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let catalog = catalog(vec![item_schema()]);
        let migrator = SchemaMigrator::new(&db, &catalog);

        assert!(!migrator.migrate().unwrap().is_noop());

        let second = migrator.migrate().unwrap();
        assert!(second.is_noop());
        assert_eq!(second.unchanged, vec!["item"]);
        assert_eq!(db.table_columns("item").unwrap().len(), 5);
    }

    #[test]
    fn test_added_field_adds_one_column_and_keeps_rows() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let v1 = catalog(vec![item_schema()]);
        SchemaMigrator::new(&db, &v1).migrate().unwrap();

        db.run(
            "INSERT INTO item (name, item_name, rate) VALUES (?, ?, ?)",
            &[Value::from("ITEM-001"), Value::from("Apple"), Value::from(2.5)],
        )
        .unwrap();

        let v2 = catalog(vec![item_schema().field(
            FieldDefinition::new("stock_uom", FieldType::Link).with_default("Nos"),
        )]);
        let report = SchemaMigrator::new(&db, &v2).migrate().unwrap();
        assert_eq!(
            report.altered,
            vec![("item".to_string(), vec!["stock_uom".to_string()])]
        );
        assert_eq!(db.table_columns("item").unwrap().len(), 6);

        let rows = db.sql("SELECT * FROM item", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::from("ITEM-001"));
        assert_eq!(rows[0]["item_name"], Value::from("Apple"));
        assert_eq!(rows[0]["rate"], Value::Real(2.5));
        assert_eq!(rows[0]["stock_uom"], Value::from("Nos"));
    }

    #[test]
    fn test_each_added_column_keeps_its_own_default() {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaMigrator::new(&db, &catalog(vec![item_schema()]))
            .migrate()
            .unwrap();
        db.run("INSERT INTO item (name) VALUES (?)", &[Value::from("A")])
            .unwrap();

        let v2 = catalog(vec![item_schema()
            .field(FieldDefinition::new("color", FieldType::Color).with_default("red"))
            .field(FieldDefinition::new("qty", FieldType::Int).with_default(7))]);
        let report = SchemaMigrator::new(&db, &v2).migrate().unwrap();
        assert_eq!(report.columns_added(), 2);

        let rows = db.sql("SELECT color, qty FROM item", &[]).unwrap();
        assert_eq!(rows[0]["color"], Value::from("red"));
        assert_eq!(rows[0]["qty"], Value::Integer(7));
    }

    #[test]
    fn test_required_column_without_default_added_nullable() {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaMigrator::new(&db, &catalog(vec![item_schema()]))
            .migrate()
            .unwrap();

        let v2 = catalog(vec![
            item_schema().field(FieldDefinition::new("barcode", FieldType::Barcode).required())
        ]);
        let report = SchemaMigrator::new(&db, &v2).migrate().unwrap();
        assert_eq!(report.columns_added(), 1);
    }

    #[test]
    fn test_type_change_does_not_alter_column() {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaMigrator::new(&db, &catalog(vec![item_schema()]))
            .migrate()
            .unwrap();

        let retyped = RecordTypeSchema::new("Item")
            .field(FieldDefinition::new("name", FieldType::Data).required())
            .field(FieldDefinition::new("item_name", FieldType::Int));
        let report = SchemaMigrator::new(&db, &catalog(vec![retyped]))
            .migrate()
            .unwrap();
        assert!(report.is_noop());
        // columns no longer in the schema stay
        assert_eq!(db.table_columns("item").unwrap().len(), 5);
    }

    #[test]
    fn test_plan() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let todo = RecordTypeSchema::new("ToDo")
            .field(FieldDefinition::new("name", FieldType::Data));
        let v1 = catalog(vec![item_schema()]);
        SchemaMigrator::new(&db, &v1).migrate().unwrap();

        let v2 = catalog(vec![
            item_schema().field(FieldDefinition::new("brand", FieldType::Link)),
            todo,
        ]);
        let migrator = SchemaMigrator::new(&db, &v2);
        let plan = migrator.plan().unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0].status,
            TableStatus::MissingColumns(vec!["brand".to_string()])
        );
        assert_eq!(plan[0].status.to_string(), "missing columns: brand");
        assert_eq!(plan[1].table, "todo");
        assert_eq!(plan[1].status, TableStatus::Missing);

        // planning does not touch the database
        assert!(!db.table_exists("todo").unwrap());

        migrator.migrate().unwrap();
        assert!(migrator
            .plan()
            .unwrap()
            .iter()
            .all(|p| p.status == TableStatus::Current));
    }

    #[test]
    fn test_failure_names_the_record_type() {
        let db = DatabaseConn::open_in_memory().unwrap();
        // columns differing only by case collide in SQLite
        let broken = item_schema().field(FieldDefinition::new("Status", FieldType::Data));
        let catalog = catalog(vec![broken]);

        let err = SchemaMigrator::new(&db, &catalog).migrate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'Item'"), "{}", msg);
        assert!(msg.contains("(item)"), "{}", msg);
        assert!(!db.table_exists("item").unwrap());
    }

    #[test]
    fn test_partial_migration_is_kept() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let todo = RecordTypeSchema::new("ToDo")
            .field(FieldDefinition::new("name", FieldType::Data))
            .field(FieldDefinition::new("Name", FieldType::Int));
        let catalog = catalog(vec![item_schema(), todo]);

        let err = SchemaMigrator::new(&db, &catalog).migrate().unwrap_err();
        assert!(err.to_string().contains("'ToDo'"));
        assert!(db.table_exists("item").unwrap());
        assert!(!db.table_exists("todo").unwrap());
    }

    #[test]
    fn test_keyword_table_and_column_names() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let order = RecordTypeSchema::new("Order")
            .field(FieldDefinition::new("name", FieldType::Data).required())
            .field(FieldDefinition::new("from", FieldType::Data))
            .field(FieldDefinition::new("index", FieldType::Int).with_default(0));
        let migrator_catalog = catalog(vec![order.clone()]);
        let report = SchemaMigrator::new(&db, &migrator_catalog).migrate().unwrap();
        assert_eq!(report.created, vec!["order"]);
        assert_eq!(
            db.table_columns("order").unwrap(),
            vec!["name", "from", "index"]
        );

        let v2 = catalog(vec![order.field(FieldDefinition::new("group", FieldType::Data))]);
        let report = SchemaMigrator::new(&db, &v2).migrate().unwrap();
        assert_eq!(
            report.altered,
            vec![("order".to_string(), vec!["group".to_string()])]
        );
    }

    #[test]
    fn test_layout_only_type_is_skipped() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let dashboard = RecordTypeSchema::new("Dashboard")
            .field(FieldDefinition::new("overview", FieldType::SectionBreak))
            .field(FieldDefinition::new("split", FieldType::ColumnBreak))
            .field(FieldDefinition::new("items", FieldType::Table));
        let catalog = catalog(vec![dashboard, item_schema()]);
        let migrator = SchemaMigrator::new(&db, &catalog);

        let plan = migrator.plan().unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].table, "item");

        let report = migrator.migrate().unwrap();
        assert_eq!(report.created, vec!["item"]);
        assert!(!db.table_exists("dashboard").unwrap());
    }
}
