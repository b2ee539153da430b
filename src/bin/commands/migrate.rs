use anyhow::Result;
use clap::Args;
use recordkit::database::{MigrationReport, RecordDatabase, TablePlan};
use recordkit::utils::OutputFormat;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Migrate command
#[derive(Args)]
pub struct MigrateArgs {
    /// Only show what would change, without touching the database
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    record_type: String,
    table: String,
    status: String,
}

impl From<&TablePlan> for MigrationRow {
    fn from(plan: &TablePlan) -> Self {
        MigrationRow {
            record_type: plan.record_type.clone(),
            table: plan.table.clone(),
            status: plan.status.to_string(),
        }
    }
}

fn report_rows(report: &MigrationReport) -> Vec<MigrationRow> {
    let mut rows = Vec::new();
    for table in &report.created {
        rows.push(MigrationRow {
            record_type: String::new(),
            table: table.clone(),
            status: "created".to_string(),
        });
    }
    for (table, columns) in &report.altered {
        rows.push(MigrationRow {
            record_type: String::new(),
            table: table.clone(),
            status: format!("added {}", columns.join(", ")),
        });
    }
    for table in &report.unchanged {
        rows.push(MigrationRow {
            record_type: String::new(),
            table: table.clone(),
            status: "unchanged".to_string(),
        });
    }
    rows
}

pub fn run(db: &RecordDatabase, args: MigrateArgs, output_format: OutputFormat) -> Result<()> {
    let MigrateArgs { dry_run } = args;

    // Pair every table with its record type for display
    let plan = db.plan()?;
    let rows = if dry_run {
        plan.iter().map(MigrationRow::from).collect()
    } else {
        let report = db.migrate()?;
        let mut rows = report_rows(&report);
        for row in rows.iter_mut() {
            if let Some(p) = plan.iter().find(|p| p.table == row.table) {
                row.record_type = p.record_type.clone();
            }
        }
        rows
    };

    format_output(&rows, output_format)
}

fn format_output(rows: &[MigrationRow], output_format: OutputFormat) -> Result<()> {
    match output_format {
        OutputFormat::Table => {
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        OutputFormat::Markdown => {
            println!("{}", Table::new(rows).with(Style::markdown()));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(rows)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::JsonLine => {
            for r in rows {
                println!("{}", serde_json::to_string(r)?);
            }
        }
        OutputFormat::Psv => {
            println!("record_type|table|status");
            for r in rows {
                println!("{}|{}|{}", r.record_type, r.table, r.status);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_rows() {
        let report = MigrationReport {
            created: vec!["todo".to_string()],
            altered: vec![(
                "item".to_string(),
                vec!["brand".to_string(), "qty".to_string()],
            )],
            unchanged: vec!["note".to_string()],
        };
        let rows = report_rows(&report);
        let statuses: Vec<&str> = rows.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["created", "added brand, qty", "unchanged"]);
    }
}
