//! Query builder for filtered record listings
//!
//! Builds a single parameterized SELECT from a field list, a filter
//! specification, ordering and pagination.
//!
//! # Usage
//!
//! ```rust,ignore
//! use recordkit::database::{Filters, GetAllQuery, SortOrder};
//!
//! let query = GetAllQuery::new("Item")
//!     .fields(&["name", "rate"])
//!     .filters(Filters::new().eq("status", "Open"))
//!     .limit(2)
//!     .start(1)
//!     .order(SortOrder::Asc);
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::filters::Filters;
use super::ident::{join_idents, Ident};
use super::value::Value;
use crate::schema::RecordTypeSchema;

/// Ordering field used when the caller does not pick one
pub const DEFAULT_ORDER_BY: &str = "modified";

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Unknown sort order '{}'. Use asc or desc", s)),
        }
    }
}

/// Options for listing records of one type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetAllQuery {
    /// Record type to list
    #[serde(rename = "type")]
    pub record_type: String,
    /// Columns to return; the type's keyword fields when unset, `*` for all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub filters: Filters,
    /// Number of matching rows to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Maximum number of rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Ordering field, `modified` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

/// A built statement with its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl GetAllQuery {
    /// Create a new listing query for a record type
    pub fn new(record_type: &str) -> Self {
        Self {
            record_type: record_type.to_string(),
            ..Default::default()
        }
    }

    /// Set the returned columns
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Set the filter specification
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Set OFFSET
    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    /// Set LIMIT
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set ORDER BY field
    pub fn order_by(mut self, field: &str) -> Self {
        self.order_by = Some(field.to_string());
        self
    }

    /// Set sort direction
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Resolve the projection against the schema
    fn projection(&self, schema: &RecordTypeSchema) -> Result<String> {
        let fields = match &self.fields {
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => schema.keyword_fields(),
        };

        if fields.iter().any(|f| f == "*") {
            return Ok("*".to_string());
        }

        let columns = fields
            .iter()
            .map(|f| schema.column(f))
            .collect::<Result<Vec<Ident>>>()?;
        Ok(join_idents(&columns))
    }

    /// Resolve the ORDER BY column
    ///
    /// An explicit field must exist and an empty one disables ordering.
    /// The implicit `modified` default is dropped for record types that do
    /// not declare it.
    fn order_column(&self, schema: &RecordTypeSchema) -> Result<Option<Ident>> {
        match self.order_by.as_deref() {
            Some("") => Ok(None),
            Some(field) => schema.column(field).map(Some),
            None => Ok(schema
                .persisted_field(DEFAULT_ORDER_BY)
                .and_then(|_| Ident::new(DEFAULT_ORDER_BY).ok())),
        }
    }

    /// Build the SELECT statement for `schema`
    pub fn build(&self, schema: &RecordTypeSchema) -> Result<BuiltQuery> {
        if schema.name != self.record_type {
            return Err(anyhow!(
                "Query for '{}' built against schema of '{}'",
                self.record_type,
                schema.name
            ));
        }

        let table = schema.table_name()?;
        let columns = self.projection(schema)?;
        let where_clause = self.filters.compile(schema)?;

        let mut sql = format!("SELECT {} FROM {}{}", columns, table, where_clause.to_sql());

        if let Some(column) = self.order_column(schema)? {
            sql.push_str(&format!(" ORDER BY {} {}", column, self.order));
        }

        let limit = self.limit.filter(|l| *l > 0);
        let start = self.start.filter(|s| *s > 0);

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(start) = start {
            // SQLite only accepts OFFSET after a LIMIT
            if limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            sql.push_str(&format!(" OFFSET {}", start));
        }

        Ok(BuiltQuery {
            sql,
            params: where_clause.params,
        })
    }

    /// Build a count query with the same filters
    pub fn build_count(&self, schema: &RecordTypeSchema) -> Result<BuiltQuery> {
        let table = schema.table_name()?;
        let where_clause = self.filters.compile(schema)?;

        Ok(BuiltQuery {
            sql: format!("SELECT COUNT(*) AS count FROM {}{}", table, where_clause.to_sql()),
            params: where_clause.params,
        })
    }
}
