//! Schema catalog
//!
//! The catalog is the explicit list of record types the store knows about.
//! It is handed to the database at startup instead of being discovered from
//! some global registry, so tests and tools can build one directly.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::field_type::{FieldType, SqlType};
use crate::database::core::{Ident, Value};

/// Field that acts as the primary key of every record type
pub const PRIMARY_KEY_FIELD: &str = "name";

/// One attribute of a record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDefinition {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            default: None,
        }
    }

    /// Mark the field as required (NOT NULL)
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the column default
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Column type for this field, `None` if it is not persisted
    pub fn sql_type(&self) -> Option<SqlType> {
        self.field_type.sql_type()
    }

    /// A `null` default is the same as no default
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref().filter(|v| !v.is_null())
    }
}

/// Schema of one record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTypeSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Fields returned by listings when the caller asks for none in particular
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyword_fields: Vec<String>,
}

impl RecordTypeSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            keyword_fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_keyword_fields(mut self, fields: &[&str]) -> Self {
        self.keyword_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Fields that get a column, in declaration order
    pub fn persisted_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.field_type.is_persisted())
    }

    /// Look up a persisted field by name
    pub fn persisted_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.persisted_fields().find(|f| f.name == name)
    }

    /// Default display/search fields; `name` when none are designated
    pub fn keyword_fields(&self) -> Vec<String> {
        if self.keyword_fields.is_empty() {
            vec![PRIMARY_KEY_FIELD.to_string()]
        } else {
            self.keyword_fields.clone()
        }
    }

    /// Table name for this record type
    pub fn table_name(&self) -> Result<Ident> {
        Ident::new(&slug(&self.name))
            .map_err(|e| anyhow!("Record type '{}' has no usable table name: {}", self.name, e))
    }

    /// Resolve a caller-supplied field name to a column identifier
    ///
    /// Only persisted fields declared by the schema resolve.
    pub fn column(&self, field: &str) -> Result<Ident> {
        let def = self.persisted_field(field).ok_or_else(|| {
            anyhow!(
                "Record type '{}' has no persisted field '{}'",
                self.name,
                field
            )
        })?;
        Ident::new(&def.name)
    }
}

/// Ordered collection of record type schemas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub record_types: Vec<RecordTypeSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record type; a later schema with the same name replaces the earlier one
    pub fn with(mut self, schema: RecordTypeSchema) -> Self {
        self.insert(schema);
        self
    }

    pub fn insert(&mut self, schema: RecordTypeSchema) {
        match self.record_types.iter_mut().find(|s| s.name == schema.name) {
            Some(existing) => *existing = schema,
            None => self.record_types.push(schema),
        }
    }

    /// Parse a catalog from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| anyhow!("Failed to parse schema catalog: {}", e))
    }

    /// Load a catalog from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read schema file '{}': {}", path.display(), e))?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, record_type: &str) -> Option<&RecordTypeSchema> {
        self.record_types.iter().find(|s| s.name == record_type)
    }

    /// Look up a record type, failing with a clear message when it is unknown
    pub fn schema(&self, record_type: &str) -> Result<&RecordTypeSchema> {
        self.get(record_type)
            .ok_or_else(|| anyhow!("Unknown record type '{}'", record_type))
    }

    /// Record types with at least one persisted field, in catalog order
    ///
    /// Types made only of layout fields (or no fields at all) get no table.
    pub fn persisted_types(&self) -> impl Iterator<Item = &RecordTypeSchema> {
        self.record_types
            .iter()
            .filter(|s| s.persisted_fields().next().is_some())
    }

    pub fn len(&self) -> usize {
        self.record_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_types.is_empty()
    }
}

/// Turn a record type name into a table name
///
/// Lowercases and replaces everything outside `[a-z0-9_]` with `_`.
pub fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_schema() -> RecordTypeSchema {
        RecordTypeSchema::new("Item")
            .field(FieldDefinition::new("name", FieldType::Data).required())
            .field(FieldDefinition::new("description", FieldType::Text))
            .field(FieldDefinition::new("details", FieldType::SectionBreak))
            .field(FieldDefinition::new("rate", FieldType::Currency).with_default(0.0))
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Item"), "item");
        assert_eq!(slug("Sales Invoice"), "sales_invoice");
        assert_eq!(slug("ToDo-List"), "todo_list");
    }

    #[test]
    fn test_persisted_fields_skip_ui_types() {
        let schema = item_schema();
        let names: Vec<&str> = schema.persisted_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "description", "rate"]);
    }

    #[test]
    fn test_keyword_fields_fallback() {
        assert_eq!(item_schema().keyword_fields(), vec!["name".to_string()]);
        let schema = item_schema().with_keyword_fields(&["name", "description"]);
        assert_eq!(schema.keyword_fields(), vec!["name", "description"]);
    }

    #[test]
    fn test_column_resolution() {
        let schema = item_schema();
        assert_eq!(schema.column("rate").unwrap().as_str(), "rate");
        assert!(schema.column("details").is_err());
        assert!(schema.column("rate; DROP TABLE item").is_err());
    }

    #[test]
    fn test_table_name() {
        let schema = RecordTypeSchema::new("Sales Invoice");
        assert_eq!(schema.table_name().unwrap().as_str(), "sales_invoice");
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{
            "record_types": [
                {
                    "name": "ToDo",
                    "keyword_fields": ["name", "subject"],
                    "fields": [
                        {"name": "name", "type": "Data", "required": true},
                        {"name": "subject", "type": "Small Text"},
                        {"name": "status", "type": "Select", "default": "Open"},
                        {"name": "priority", "type": "Int", "default": 1}
                    ]
                },
                {"name": "Desk"},
                {
                    "name": "Dashboard",
                    "fields": [
                        {"name": "overview", "type": "Section Break"},
                        {"name": "items", "type": "Table"}
                    ]
                }
            ]
        }"#;
        let catalog = SchemaCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 3);

        let todo = catalog.schema("ToDo").unwrap();
        assert_eq!(todo.fields.len(), 4);
        assert!(todo.fields[0].required);
        assert_eq!(todo.fields[2].default, Some(Value::Text("Open".to_string())));
        assert_eq!(todo.fields[3].default, Some(Value::Integer(1)));

        let persisted: Vec<&str> = catalog.persisted_types().map(|s| s.name.as_str()).collect();
        assert_eq!(persisted, vec!["ToDo"]);
        assert!(catalog.schema("Nope").is_err());
    }

    #[test]
    fn test_catalog_insert_replaces() {
        let mut catalog = SchemaCatalog::new().with(item_schema());
        catalog.insert(RecordTypeSchema::new("Item"));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.schema("Item").unwrap().fields.is_empty());
    }

    #[test]
    fn test_null_default_is_no_default() {
        let field = FieldDefinition::new("x", FieldType::Data).with_default(Value::Null);
        assert!(field.default_value().is_none());
    }
}
