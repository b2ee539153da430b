use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::database::DATABASE_FILE_NAME;

#[derive(Debug, Clone, Serialize)]
pub struct RecordkitConfig {
    /// Path to the directory holding the record database
    pub data_dir: String,

    /// Path to the schema catalog JSON file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

const EMPTY_CONFIG: &str = r#"### recordkit configuration file

### directory for the record database
# data_dir = "~/.recordkit"

### schema catalog (JSON list of record types)
# schema_path = "~/.recordkit/schema.json"
"#;

fn home_dir() -> Result<String> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .to_str()
        .ok_or_else(|| anyhow!("Could not convert home directory path to string"))
        .map(str::to_owned)
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> Result<String> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(format!("{}/{}", home_dir()?, rest)),
        None => Ok(path.to_string()),
    }
}

impl Default for RecordkitConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.recordkit", home_dir),
            schema_path: None,
        }
    }
}

impl RecordkitConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<RecordkitConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.recordkit/recordkit.toml as the configuration file path
        let recordkit_dir = format!("{}/.recordkit", home_dir()?);

        match path {
            Some(p) => {
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(recordkit_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create recordkit directory: {}", e))?;
                let p = Self::config_file_path();
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of RECORDKIT)
        // E.g., `RECORDKIT_DATA_DIR=/tmp/records ./recordkit` would set the data directory
        builder = builder.add_source(config::Environment::with_prefix("RECORDKIT"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    fn from_map(config: &HashMap<String, String>) -> Result<RecordkitConfig> {
        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p)?,
            None => Self::default().data_dir,
        };

        let schema_path = config
            .get("schema_path")
            .filter(|p| !p.is_empty())
            .map(|p| expand_home(p))
            .transpose()?;

        Ok(RecordkitConfig {
            data_dir,
            schema_path,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, DATABASE_FILE_NAME)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Config File:        {}", Self::config_file_path()),
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!(
                "Schema Path:        {}",
                self.schema_path.as_deref().unwrap_or("(not set)")
            ),
        ];

        let sqlite_path = self.sqlite_path();
        if let Ok(meta) = std::fs::metadata(&sqlite_path) {
            lines.push(format!("Database Size:      {}", format_size(meta.len())));
        }

        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.recordkit/recordkit.toml", home_dir)
    }
}

/// Format a size in bytes to a human-readable string
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecordkitConfig::default();
        assert!(config.data_dir.ends_with(".recordkit"));
        assert!(config.schema_path.is_none());
        assert!(config.sqlite_path().ends_with("/.recordkit/recordkit.sqlite3"));
    }

    #[test]
    fn test_sqlite_path_trims_slash() {
        let config = RecordkitConfig {
            data_dir: "/tmp/records/".to_string(),
            schema_path: None,
        };
        assert_eq!(config.sqlite_path(), "/tmp/records/recordkit.sqlite3");
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("data_dir".to_string(), "/srv/records".to_string());
        map.insert("schema_path".to_string(), "/srv/schema.json".to_string());
        let config = RecordkitConfig::from_map(&map).unwrap();
        assert_eq!(config.data_dir, "/srv/records");
        assert_eq!(config.schema_path.as_deref(), Some("/srv/schema.json"));

        map.insert("schema_path".to_string(), String::new());
        assert!(RecordkitConfig::from_map(&map)
            .unwrap()
            .schema_path
            .is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordkit.toml");
        std::fs::write(
            &path,
            "data_dir = \"/srv/records\"\nschema_path = \"/srv/schema.json\"\n",
        )
        .unwrap();

        let config = RecordkitConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.data_dir, "/srv/records");
        assert_eq!(config.schema_path.as_deref(), Some("/srv/schema.json"));
    }

    #[test]
    fn test_missing_file_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.toml");

        let config = RecordkitConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert!(path.exists());
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("recordkit configuration file"));
        assert!(config.data_dir.ends_with(".recordkit"));
    }

    #[test]
    fn test_summary() {
        let config = RecordkitConfig {
            data_dir: "/srv/records".to_string(),
            schema_path: None,
        };
        let summary = config.summary();
        assert!(summary.contains("/srv/records/recordkit.sqlite3"));
        assert!(summary.contains("(not set)"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
