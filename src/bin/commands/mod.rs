pub mod config;
pub mod list;
pub mod migrate;
pub mod record;
pub mod record_format;

use anyhow::{anyhow, Result};
use recordkit::database::{ensure_data_dir, Record, RecordDatabase};
use recordkit::schema::SchemaCatalog;
use recordkit::RecordkitConfig;

/// Open the record database named on the command line or in the configuration
pub(crate) fn open_database(
    config: &RecordkitConfig,
    schema_path: Option<&str>,
    db_path: Option<&str>,
) -> Result<RecordDatabase> {
    let schema_path = schema_path
        .or(config.schema_path.as_deref())
        .ok_or_else(|| {
            anyhow!("No schema catalog given; use --schema or set schema_path in the configuration")
        })?;
    let catalog = SchemaCatalog::from_json_file(schema_path)?;

    match db_path {
        Some(path) => RecordDatabase::open(path, catalog),
        None => {
            ensure_data_dir(&config.data_dir)?;
            RecordDatabase::open(&config.sqlite_path(), catalog)
        }
    }
}

/// Parse a record given as a JSON object on the command line
pub(crate) fn parse_record(json: &str) -> Result<Record> {
    serde_json::from_str::<Record>(json)
        .map_err(|e| anyhow!("Record must be a JSON object of field values: {}", e))
}
