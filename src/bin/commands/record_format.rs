//! Shared formatting for records
//!
//! Records of one type can come back with different column sets depending on
//! the requested fields, so tables are built dynamically from the union of
//! their keys.

use anyhow::Result;
use recordkit::database::Record;
use recordkit::schema::PRIMARY_KEY_FIELD;
use recordkit::utils::OutputFormat;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Column order for a set of records
///
/// Requested fields keep their order. Otherwise `name` comes first and the
/// remaining keys follow alphabetically.
pub fn record_columns(records: &[Record], fields: Option<&[String]>) -> Vec<String> {
    if let Some(fields) = fields {
        if !fields.iter().any(|f| f == "*") {
            return fields.to_vec();
        }
    }

    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns.sort_by_key(|c| (c.as_str() != PRIMARY_KEY_FIELD, c.clone()));
    columns
}

fn cell(record: &Record, column: &str) -> String {
    record
        .get(column)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Render records in the requested output format
pub fn format_records(
    records: &[Record],
    fields: Option<&[String]>,
    output_format: OutputFormat,
) -> Result<String> {
    let columns = record_columns(records, fields);

    let output = match output_format {
        OutputFormat::Table | OutputFormat::Markdown => {
            let mut builder = Builder::default();
            builder.push_record(columns.iter().map(String::as_str));
            for record in records {
                builder.push_record(columns.iter().map(|c| cell(record, c)));
            }
            let mut table = builder.build();
            if output_format == OutputFormat::Markdown {
                table.with(Style::markdown());
            } else {
                table.with(Style::rounded());
            }
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string(records)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(records)?,
        OutputFormat::JsonLine => records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
        OutputFormat::Psv => {
            let mut lines = vec![columns.join("|")];
            for record in records {
                lines.push(
                    columns
                        .iter()
                        .map(|c| cell(record, c))
                        .collect::<Vec<_>>()
                        .join("|"),
                );
            }
            lines.join("\n")
        }
    };

    Ok(output)
}
