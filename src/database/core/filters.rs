//! Filter specifications and their compilation into WHERE clauses
//!
//! A filter maps a field name to either a bare value (equality) or an
//! operator/value pair:
//!
//! ```rust,ignore
//! use recordkit::database::{Filters, Operator};
//!
//! let filters = Filters::new()
//!     .eq("status", "Open")
//!     .with("name", Operator::Like, "apple");
//! // => "status" = ? AND "name" like ?, bound to ["Open", "%apple%"]
//! ```
//!
//! Field names are resolved through the record type schema and operators are
//! a closed set, so the only caller text that reaches SQL is bound values.

use anyhow::{anyhow, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::value::Value;
use crate::schema::{RecordTypeSchema, PRIMARY_KEY_FIELD};

/// Comparison operator in a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::NotEq),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "like" => Ok(Operator::Like),
            "not like" => Ok(Operator::NotLike),
            _ => Err(anyhow!("Unsupported filter operator '{}'", s)),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_sql().to_string()
    }
}

/// Condition on a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// `[operator, value]`
    Compare(Operator, Value),
    /// Bare value, compared for equality
    Equals(Value),
}

impl Condition {
    /// The SQL operator and the value to bind
    ///
    /// A `like` pattern without any `%` is wrapped as `%value%`; `not like`
    /// patterns are bound as given.
    fn operator_and_value(&self) -> (Operator, Value) {
        match self {
            Condition::Equals(v) => (Operator::Eq, v.clone()),
            Condition::Compare(Operator::Like, Value::Text(s)) if !s.contains('%') => {
                (Operator::Like, Value::Text(format!("%{}%", s)))
            }
            Condition::Compare(op, v) => (*op, v.clone()),
        }
    }
}

/// Filter specification: field name to condition, in insertion order
///
/// As JSON this is an object; clauses follow the order of its keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    conditions: Vec<(String, Condition)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality on `field`
    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.condition(field, Condition::Equals(value.into()))
    }

    /// `field <op> value`
    pub fn with(self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.condition(field, Condition::Compare(op, value.into()))
    }

    /// Set the condition for `field`, replacing any earlier one
    pub fn condition(mut self, field: &str, condition: Condition) -> Self {
        match self.conditions.iter_mut().find(|(f, _)| f == field) {
            Some(existing) => existing.1 = condition,
            None => self.conditions.push((field.to_string(), condition)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Condition)> {
        self.conditions.iter()
    }

    /// Compile into a WHERE clause for `schema`
    ///
    /// Every field must be a persisted field of the record type.
    pub fn compile(&self, schema: &RecordTypeSchema) -> Result<WhereClause> {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::with_capacity(self.conditions.len());

        for (field, condition) in &self.conditions {
            let column = schema.column(field)?;
            let (op, value) = condition.operator_and_value();
            clauses.push(format!("{} {} ?", column, op));
            params.push(value);
        }

        Ok(WhereClause { clauses, params })
    }
}

/// `get_value("Item", "ITEM-001")` shorthand for `{name: "ITEM-001"}`
impl From<&str> for Filters {
    fn from(id: &str) -> Self {
        Filters::new().eq(PRIMARY_KEY_FIELD, id)
    }
}

impl From<String> for Filters {
    fn from(id: String) -> Self {
        Filters::new().eq(PRIMARY_KEY_FIELD, id)
    }
}

impl<K: Into<String>> FromIterator<(K, Condition)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, Condition)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Filters::new(), |f, (k, c)| f.condition(&k.into(), c))
    }
}

impl From<BTreeMap<String, Condition>> for Filters {
    fn from(map: BTreeMap<String, Condition>) -> Self {
        map.into_iter().collect()
    }
}

impl Serialize for Filters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.conditions.len()))?;
        for (field, condition) in &self.conditions {
            map.serialize_entry(field, condition)?;
        }
        map.end()
    }
}

struct FiltersVisitor;

impl<'de> Visitor<'de> for FiltersVisitor {
    type Value = Filters;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping field names to conditions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Filters, A::Error> {
        let mut filters = Filters::new();
        while let Some((field, condition)) = access.next_entry::<String, Condition>()? {
            filters = filters.condition(&field, condition);
        }
        Ok(filters)
    }
}

impl<'de> Deserialize<'de> for Filters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FiltersVisitor)
    }
}

/// Compiled filter: clause fragments plus their bound values, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub clauses: Vec<String>,
    pub params: Vec<Value>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Conditions joined with AND, without the WHERE keyword
    pub fn conditions(&self) -> String {
        self.clauses.join(" AND ")
    }

    /// ` WHERE ...`, or an empty string when there are no conditions
    pub fn to_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, FieldType};

    fn schema() -> RecordTypeSchema {
        RecordTypeSchema::new("ToDo")
            .field(FieldDefinition::new("name", FieldType::Data))
            .field(FieldDefinition::new("status", FieldType::Select))
            .field(FieldDefinition::new("priority", FieldType::Int))
            .field(FieldDefinition::new("layout", FieldType::ColumnBreak))
    }

    #[test]
    fn test_equality_filter() {
        let clause = Filters::new().eq("status", "Open").compile(&schema()).unwrap();
        assert_eq!(clause.conditions(), r#""status" = ?"#);
        assert_eq!(clause.params, vec![Value::from("Open")]);
    }

    #[test]
    fn test_like_gets_wildcards() {
        let clause = Filters::new()
            .with("name", Operator::Like, "apple")
            .compile(&schema())
            .unwrap();
        assert_eq!(clause.conditions(), r#""name" like ?"#);
        assert_eq!(clause.params, vec![Value::from("%apple%")]);
    }

    #[test]
    fn test_not_like_binds_pattern_unchanged() {
        let clause = Filters::new()
            .with("name", Operator::NotLike, "apple")
            .compile(&schema())
            .unwrap();
        assert_eq!(clause.conditions(), r#""name" not like ?"#);
        assert_eq!(clause.params, vec![Value::from("apple")]);
    }

    #[test]
    fn test_like_with_wildcard_unchanged() {
        let clause = Filters::new()
            .with("name", Operator::Like, "%apple%")
            .compile(&schema())
            .unwrap();
        assert_eq!(clause.params, vec![Value::from("%apple%")]);

        let clause = Filters::new()
            .with("name", Operator::Like, "apple%")
            .compile(&schema())
            .unwrap();
        assert_eq!(clause.params, vec![Value::from("apple%")]);
    }

    #[test]
    fn test_multiple_conditions_joined_with_and() {
        let clause = Filters::new()
            .eq("status", "Open")
            .with("priority", Operator::Ge, 2)
            .compile(&schema())
            .unwrap();
        assert_eq!(clause.to_sql(), r#" WHERE "status" = ? AND "priority" >= ?"#);
        assert_eq!(clause.params, vec![Value::from("Open"), Value::from(2)]);
    }

    #[test]
    fn test_empty_filters_omit_where() {
        let clause = Filters::new().compile(&schema()).unwrap();
        assert!(clause.is_empty());
        assert_eq!(clause.to_sql(), "");
    }

    #[test]
    fn test_unknown_or_unpersisted_field_rejected() {
        assert!(Filters::new().eq("missing", 1).compile(&schema()).is_err());
        assert!(Filters::new().eq("layout", 1).compile(&schema()).is_err());
        assert!(Filters::new()
            .eq("status = 1 OR 1", 1)
            .compile(&schema())
            .is_err());
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("LIKE".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("Not  Like".parse::<Operator>().unwrap(), Operator::NotLike);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert!("; drop".parse::<Operator>().is_err());
    }

    #[test]
    fn test_id_shorthand() {
        let filters = Filters::from("ITEM-001");
        let clause = filters.compile(&schema()).unwrap();
        assert_eq!(clause.conditions(), r#""name" = ?"#);
        assert_eq!(clause.params, vec![Value::from("ITEM-001")]);
    }

    #[test]
    fn test_filters_from_json() {
        let filters: Filters =
            serde_json::from_str(r#"{"status": "Open", "name": ["like", "apple"]}"#).unwrap();
        assert_eq!(filters.len(), 2);
        let clause = filters.compile(&schema()).unwrap();
        // document order, not sorted
        assert_eq!(clause.conditions(), r#""status" = ? AND "name" like ?"#);
        assert_eq!(
            clause.params,
            vec![Value::from("Open"), Value::from("%apple%")]
        );
    }

    #[test]
    fn test_filters_to_json_keep_order() {
        let filters = Filters::new()
            .with("priority", Operator::Ge, 2)
            .eq("name", "ITEM-001");
        let json = serde_json::to_string(&filters).unwrap();
        assert_eq!(json, r#"{"priority":[">=",2],"name":"ITEM-001"}"#);

        let back: Filters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filters);
        assert!(serde_json::from_str::<Filters>(r#"["name", "x"]"#).is_err());
    }

    #[test]
    fn test_replacing_condition() {
        let filters = Filters::new().eq("status", "Open").eq("status", "Closed");
        assert_eq!(filters.len(), 1);
    }
}
