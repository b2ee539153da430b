use anyhow::Result;
use clap::Args;
use recordkit::database::{
    Condition, Filters, GetAllQuery, Operator, RecordDatabase, SortOrder, Value,
};
use recordkit::utils::{split_fields, OutputFormat};
use serde_json::json;
use std::str::FromStr;

use super::record_format::format_records;

/// A `--filter` argument: `FIELD=VALUE` or `FIELD:OP:VALUE`
///
/// Values are bound as text; SQLite converts them for numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterArg {
    pub field: String,
    pub condition: Condition,
}

impl FromStr for FilterArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let colon = s.find(':');
        let equals = s.find('=');

        match (colon, equals) {
            (Some(c), e) if e.map(|e| c < e).unwrap_or(true) => {
                let mut parts = s.splitn(3, ':');
                let field = parts.next().unwrap_or_default().trim();
                let op = parts.next().unwrap_or_default();
                let value = parts
                    .next()
                    .ok_or_else(|| format!("Filter '{}' must be FIELD:OP:VALUE", s))?;
                if field.is_empty() {
                    return Err(format!("Filter '{}' has no field", s));
                }
                let op = op.parse::<Operator>().map_err(|e| e.to_string())?;
                Ok(FilterArg {
                    field: field.to_string(),
                    condition: Condition::Compare(op, Value::from(value)),
                })
            }
            (_, Some(e)) => {
                let field = s[..e].trim();
                if field.is_empty() {
                    return Err(format!("Filter '{}' has no field", s));
                }
                Ok(FilterArg {
                    field: field.to_string(),
                    condition: Condition::Equals(Value::from(&s[e + 1..])),
                })
            }
            _ => Err(format!(
                "Filter '{}' must be FIELD=VALUE or FIELD:OP:VALUE",
                s
            )),
        }
    }
}

fn build_filters(filters: Vec<FilterArg>) -> Filters {
    filters
        .into_iter()
        .fold(Filters::new(), |acc, f| acc.condition(&f.field, f.condition))
}

/// Arguments for the List command
#[derive(Args)]
pub struct ListArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Comma-separated fields to return ("*" for all), keyword fields by default
    #[clap(long)]
    pub fields: Option<String>,

    /// Filter as FIELD=VALUE or FIELD:OP:VALUE (ops: =, !=, <, <=, >, >=, like, not like)
    #[clap(long = "filter")]
    pub filters: Vec<FilterArg>,

    /// Number of matching records to skip
    #[clap(long)]
    pub start: Option<u64>,

    /// Maximum number of records
    #[clap(long)]
    pub limit: Option<u64>,

    /// Field to order by, `modified` by default
    #[clap(long)]
    pub order_by: Option<String>,

    /// Sort direction: asc or desc (default)
    #[clap(long)]
    pub order: Option<SortOrder>,
}

/// Arguments for the Count command
#[derive(Args)]
pub struct CountArgs {
    /// Record type, e.g. "Item"
    pub record_type: String,

    /// Filter as FIELD=VALUE or FIELD:OP:VALUE
    #[clap(long = "filter")]
    pub filters: Vec<FilterArg>,
}

pub fn run(db: &RecordDatabase, args: ListArgs, output_format: OutputFormat) -> Result<()> {
    let ListArgs {
        record_type,
        fields,
        filters,
        start,
        limit,
        order_by,
        order,
    } = args;

    let fields = split_fields(fields.as_deref());

    let mut query = GetAllQuery::new(&record_type).filters(build_filters(filters));
    query.fields = fields.clone();
    query.start = start;
    query.limit = limit;
    query.order_by = order_by;
    if let Some(order) = order {
        query = query.order(order);
    }

    let records = db.get_all(&query)?;
    let columns = fields.unwrap_or_else(|| {
        db.catalog()
            .get(&record_type)
            .map(|schema| schema.keyword_fields())
            .unwrap_or_default()
    });

    println!(
        "{}",
        format_records(&records, Some(columns.as_slice()), output_format)?
    );
    Ok(())
}

pub fn count(db: &RecordDatabase, args: CountArgs, output_format: OutputFormat) -> Result<()> {
    let CountArgs {
        record_type,
        filters,
    } = args;

    let count = db.count(&record_type, &build_filters(filters))?;

    if output_format.is_json() {
        println!("{}", json!({"type": record_type, "count": count}));
    } else {
        println!("{}", count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_filter() {
        let f: FilterArg = "status=Open".parse().unwrap();
        assert_eq!(f.field, "status");
        assert_eq!(f.condition, Condition::Equals(Value::from("Open")));

        // only the first '=' separates
        let f: FilterArg = "note=a=b".parse().unwrap();
        assert_eq!(f.condition, Condition::Equals(Value::from("a=b")));
    }

    #[test]
    fn test_operator_filter() {
        let f: FilterArg = "qty:>=:5".parse().unwrap();
        assert_eq!(f.field, "qty");
        assert_eq!(
            f.condition,
            Condition::Compare(Operator::Ge, Value::from("5"))
        );

        let f: FilterArg = "item_name:NOT LIKE:apple".parse().unwrap();
        assert_eq!(
            f.condition,
            Condition::Compare(Operator::NotLike, Value::from("apple"))
        );

        let f: FilterArg = "modified:<:2024-01-02T00:00:00Z".parse().unwrap();
        assert_eq!(
            f.condition,
            Condition::Compare(Operator::Lt, Value::from("2024-01-02T00:00:00Z"))
        );
    }

    #[test]
    fn test_bad_filters() {
        assert!("status".parse::<FilterArg>().is_err());
        assert!("=Open".parse::<FilterArg>().is_err());
        assert!("qty:>=".parse::<FilterArg>().is_err());
        assert!("qty:between:1".parse::<FilterArg>().is_err());
    }

    #[test]
    fn test_build_filters_keeps_last_per_field() {
        let filters = build_filters(vec![
            "status=Open".parse().unwrap(),
            "status=Closed".parse().unwrap(),
        ]);
        assert_eq!(filters.len(), 1);
    }
}
