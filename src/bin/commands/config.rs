use recordkit::config::format_size;
use recordkit::database::{RecordDatabase, TableStatus};
use recordkit::schema::SchemaCatalog;
use recordkit::utils::OutputFormat;
use recordkit::RecordkitConfig;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    database: DatabaseInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<SchemaInfo>,
}

#[derive(Debug, Serialize)]
struct DatabaseInfo {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SchemaInfo {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_types: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_tables: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Load the catalog and count the tables a migration would still touch
fn schema_info(path: &str, sqlite_path: &str, db_exists: bool) -> SchemaInfo {
    let catalog = match SchemaCatalog::from_json_file(path) {
        Ok(c) => c,
        Err(e) => {
            return SchemaInfo {
                path: path.to_string(),
                record_types: None,
                pending_tables: None,
                error: Some(e.to_string()),
            }
        }
    };
    let record_types = Some(catalog.len());

    let pending_tables = if db_exists {
        RecordDatabase::open(sqlite_path, catalog)
            .and_then(|db| db.plan())
            .ok()
            .map(|plan| {
                plan.iter()
                    .filter(|p| p.status != TableStatus::Current)
                    .count()
            })
    } else {
        None
    };

    SchemaInfo {
        path: path.to_string(),
        record_types,
        pending_tables,
        error: None,
    }
}

pub fn run(config: &RecordkitConfig, output_format: OutputFormat) {
    let sqlite_path = config.sqlite_path();
    let sqlite_exists = Path::new(&sqlite_path).exists();
    let sqlite_size = if sqlite_exists {
        std::fs::metadata(&sqlite_path).ok().map(|m| m.len())
    } else {
        None
    };

    let schema = config
        .schema_path
        .as_deref()
        .map(|p| schema_info(p, &sqlite_path, sqlite_exists));

    let config_info = ConfigInfo {
        config_file: RecordkitConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        database: DatabaseInfo {
            path: sqlite_path,
            exists: sqlite_exists,
            size_bytes: sqlite_size,
        },
        schema,
    };

    match output_format {
        OutputFormat::Json | OutputFormat::JsonLine => match serde_json::to_string(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize config info: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize config info: {}", e),
        },
        _ => {
            // Table, Markdown, and PSV all use the same human-readable format
            print_config_table(&config_info);
        }
    }
}

fn print_config_table(info: &ConfigInfo) {
    println!("Recordkit Configuration");
    println!("=======================\n");

    println!("General:");
    println!("  Config file:    {}", info.config_file);
    println!("  Data dir:       {}", info.data_dir);
    println!();

    println!("SQLite Database:");
    println!("  Path:           {}", info.database.path);
    println!(
        "  Status:         {}",
        if info.database.exists {
            "exists"
        } else {
            "not created"
        }
    );
    if let Some(size) = info.database.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    println!();

    println!("Schema Catalog:");
    match &info.schema {
        None => println!("  Path:           (not set)"),
        Some(schema) => {
            println!("  Path:           {}", schema.path);
            if let Some(count) = schema.record_types {
                println!("  Record types:   {}", count);
            }
            if let Some(pending) = schema.pending_tables {
                println!("  Pending tables: {}", pending);
            }
            if let Some(error) = &schema.error {
                println!("  Error:          {}", error);
            }
        }
    }
}
