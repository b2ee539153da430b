use anyhow::{anyhow, Result};
use clap::Args;
use recordkit::database::{RecordDatabase, Value};
use recordkit::schema::PRIMARY_KEY_FIELD;
use recordkit::utils::{split_fields, OutputFormat};
use serde_json::json;

use super::parse_record;
use super::record_format::format_records;

/// Arguments for the Get command
#[derive(Args)]
pub struct GetArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Record name
    pub id: String,

    /// Comma-separated fields to return, all fields by default
    #[clap(long)]
    pub fields: Option<String>,
}

/// Arguments for the Insert command
#[derive(Args)]
pub struct InsertArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Record as a JSON object, e.g. '{"name": "ITEM-001", "rate": 10}'
    pub json: String,
}

/// Arguments for the Update command
#[derive(Args)]
pub struct UpdateArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Fields to change as a JSON object, including the record's name
    pub json: String,
}

/// Arguments for the Delete command
#[derive(Args)]
pub struct DeleteArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Record name
    pub id: String,
}

/// Arguments for the Value command
#[derive(Args)]
pub struct ValueArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Record name
    pub id: String,

    /// Field to read, `name` by default
    #[clap(long)]
    pub field: Option<String>,
}

pub fn get(db: &RecordDatabase, args: GetArgs, output_format: OutputFormat) -> Result<()> {
    let GetArgs {
        record_type,
        id,
        fields,
    } = args;

    let fields = split_fields(fields.as_deref());
    let field_refs: Option<Vec<&str>> = fields
        .as_ref()
        .map(|f| f.iter().map(String::as_str).collect());

    let record = db.get(&record_type, &id, field_refs.as_deref())?;
    if record.is_empty() {
        return Err(anyhow!("No '{}' record named '{}'", record_type, id));
    }

    println!(
        "{}",
        format_records(&[record], fields.as_deref(), output_format)?
    );
    Ok(())
}

pub fn insert(db: &RecordDatabase, args: InsertArgs, output_format: OutputFormat) -> Result<()> {
    let InsertArgs { record_type, json } = args;
    let record = parse_record(&json)?;

    db.insert(&record_type, &record)?;
    db.commit()?;

    let name = record
        .get(PRIMARY_KEY_FIELD)
        .map(Value::to_string)
        .unwrap_or_default();
    print_outcome(output_format, "inserted", &record_type, &name, 1);
    Ok(())
}

pub fn update(db: &RecordDatabase, args: UpdateArgs, output_format: OutputFormat) -> Result<()> {
    let UpdateArgs { record_type, json } = args;
    let record = parse_record(&json)?;

    let changed = db.update(&record_type, &record)?;
    db.commit()?;

    let name = record
        .get(PRIMARY_KEY_FIELD)
        .map(Value::to_string)
        .unwrap_or_default();
    if changed == 0 {
        return Err(anyhow!("No '{}' record named '{}'", record_type, name));
    }
    print_outcome(output_format, "updated", &record_type, &name, changed);
    Ok(())
}

pub fn delete(db: &RecordDatabase, args: DeleteArgs, output_format: OutputFormat) -> Result<()> {
    let DeleteArgs { record_type, id } = args;

    let removed = db.delete(&record_type, &id)?;
    db.commit()?;

    print_outcome(output_format, "deleted", &record_type, &id, removed);
    Ok(())
}

pub fn value(db: &RecordDatabase, args: ValueArgs, output_format: OutputFormat) -> Result<()> {
    let ValueArgs {
        record_type,
        id,
        field,
    } = args;

    let value = db
        .get_value(&record_type, id.as_str(), field.as_deref())?
        .ok_or_else(|| anyhow!("No '{}' record named '{}'", record_type, id))?;

    if output_format.is_json() {
        println!("{}", serde_json::to_string(&value)?);
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn print_outcome(
    output_format: OutputFormat,
    action: &str,
    record_type: &str,
    name: &str,
    rows: usize,
) {
    if output_format.is_json() {
        println!(
            "{}",
            json!({
                "action": action,
                "type": record_type,
                "name": name,
                "rows": rows,
            })
        );
    } else {
        println!("{} {} '{}' record(s): {}", action, rows, record_type, name);
    }
}
