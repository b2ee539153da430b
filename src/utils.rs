//! Common utility functions
//!
//! Output format selection shared by every recordkit command, and the
//! comma-separated field list parsing used by `get` and `list`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a command prints records and reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Rounded table
    #[default]
    Table,
    Markdown,
    /// One JSON document on a single line
    Json,
    JsonPretty,
    /// One record per line
    JsonLine,
    /// `|`-separated, header first
    Psv,
}

/// Accepted names; the first name of each format is the canonical one
const FORMAT_NAMES: &[(&str, OutputFormat)] = &[
    ("table", OutputFormat::Table),
    ("markdown", OutputFormat::Markdown),
    ("md", OutputFormat::Markdown),
    ("json", OutputFormat::Json),
    ("json-pretty", OutputFormat::JsonPretty),
    ("json-line", OutputFormat::JsonLine),
    ("jsonl", OutputFormat::JsonLine),
    ("psv", OutputFormat::Psv),
];

impl OutputFormat {
    /// Whether records are written as JSON rather than rendered
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Canonical names, for help and error text
    pub fn all_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for (name, format) in FORMAT_NAMES {
            if !FORMAT_NAMES
                .iter()
                .any(|(seen, f)| f == format && names.contains(seen))
            {
                names.push(name);
            }
        }
        names
    }

    fn name(&self) -> &'static str {
        FORMAT_NAMES
            .iter()
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
            .unwrap_or("table")
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FORMAT_NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                format!(
                    "Unknown output format '{}'. Valid formats: {}",
                    s,
                    Self::all_names().join(", ")
                )
            })
    }
}

/// Split a comma-separated field list, dropping blanks
///
/// Returns `None` when nothing is left, so callers fall back to their
/// default projection.
pub fn split_fields(fields: Option<&str>) -> Option<Vec<String>> {
    let fields: Vec<String> = fields?
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    (!fields.is_empty()).then_some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            "table".parse::<OutputFormat>().unwrap(),
            OutputFormat::Table
        );
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!(
            "JSONL".parse::<OutputFormat>().unwrap(),
            OutputFormat::JsonLine
        );
        assert_eq!(" PSV ".parse::<OutputFormat>().unwrap(), OutputFormat::Psv);
        assert!("ndjson".parse::<OutputFormat>().is_err());

        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("json-pretty"));
    }

    #[test]
    fn test_output_format_canonical_names() {
        assert_eq!(
            OutputFormat::all_names(),
            vec!["table", "markdown", "json", "json-pretty", "json-line", "psv"]
        );
        for name in OutputFormat::all_names() {
            let format: OutputFormat = name.parse().unwrap();
            assert_eq!(format.to_string(), name);
        }
        assert_eq!(OutputFormat::JsonLine.to_string(), "json-line");
    }

    #[test]
    fn test_output_format_kinds() {
        assert!(OutputFormat::JsonPretty.is_json());
        assert!(!OutputFormat::Psv.is_json());
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(
            split_fields(Some("name, rate,,status ")),
            Some(vec![
                "name".to_string(),
                "rate".to_string(),
                "status".to_string()
            ])
        );
        assert_eq!(split_fields(Some(" , ")), None);
        assert_eq!(split_fields(None), None);
    }
}
