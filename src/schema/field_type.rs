//! Abstract field types and their SQLite column mapping
//!
//! Record type schemas describe fields with dialect-independent type names
//! ("Currency", "Small Text", ...). This module holds the fixed table that
//! maps each of those names onto a SQLite column type. Types without an entry
//! (layout and UI-only types) never get a column.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Abstract field type as declared in a record type schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Currency,
    Int,
    Float,
    Percent,
    Check,
    #[serde(rename = "Small Text")]
    SmallText,
    #[serde(rename = "Long Text")]
    LongText,
    Code,
    #[serde(rename = "Text Editor")]
    TextEditor,
    Date,
    Datetime,
    Time,
    Text,
    Data,
    Link,
    #[serde(rename = "Dynamic Link")]
    DynamicLink,
    Password,
    Select,
    #[serde(rename = "Read Only")]
    ReadOnly,
    Attach,
    #[serde(rename = "Attach Image")]
    AttachImage,
    Signature,
    Color,
    Barcode,
    Geolocation,
    // Layout and UI-only types: no column
    #[serde(rename = "Section Break")]
    SectionBreak,
    #[serde(rename = "Column Break")]
    ColumnBreak,
    Button,
    #[serde(rename = "HTML")]
    Html,
    Table,
}

/// SQLite column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::Real => write!(f, "REAL"),
            SqlType::Text => write!(f, "TEXT"),
        }
    }
}

impl FieldType {
    /// All known field types, in declaration order
    pub const ALL: &'static [FieldType] = &[
        FieldType::Currency,
        FieldType::Int,
        FieldType::Float,
        FieldType::Percent,
        FieldType::Check,
        FieldType::SmallText,
        FieldType::LongText,
        FieldType::Code,
        FieldType::TextEditor,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Time,
        FieldType::Text,
        FieldType::Data,
        FieldType::Link,
        FieldType::DynamicLink,
        FieldType::Password,
        FieldType::Select,
        FieldType::ReadOnly,
        FieldType::Attach,
        FieldType::AttachImage,
        FieldType::Signature,
        FieldType::Color,
        FieldType::Barcode,
        FieldType::Geolocation,
        FieldType::SectionBreak,
        FieldType::ColumnBreak,
        FieldType::Button,
        FieldType::Html,
        FieldType::Table,
    ];

    /// Column type for this field type, or `None` if the type is not persisted
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            FieldType::Currency | FieldType::Float | FieldType::Percent => Some(SqlType::Real),
            FieldType::Int | FieldType::Check => Some(SqlType::Integer),
            FieldType::SmallText
            | FieldType::LongText
            | FieldType::Code
            | FieldType::TextEditor
            | FieldType::Date
            | FieldType::Datetime
            | FieldType::Time
            | FieldType::Text
            | FieldType::Data
            | FieldType::Link
            | FieldType::DynamicLink
            | FieldType::Password
            | FieldType::Select
            | FieldType::ReadOnly
            | FieldType::Attach
            | FieldType::AttachImage
            | FieldType::Signature
            | FieldType::Color
            | FieldType::Barcode
            | FieldType::Geolocation => Some(SqlType::Text),
            FieldType::SectionBreak
            | FieldType::ColumnBreak
            | FieldType::Button
            | FieldType::Html
            | FieldType::Table => None,
        }
    }

    /// Whether fields of this type get a column
    pub fn is_persisted(&self) -> bool {
        self.sql_type().is_some()
    }

    /// Name used in schema files
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Currency => "Currency",
            FieldType::Int => "Int",
            FieldType::Float => "Float",
            FieldType::Percent => "Percent",
            FieldType::Check => "Check",
            FieldType::SmallText => "Small Text",
            FieldType::LongText => "Long Text",
            FieldType::Code => "Code",
            FieldType::TextEditor => "Text Editor",
            FieldType::Date => "Date",
            FieldType::Datetime => "Datetime",
            FieldType::Time => "Time",
            FieldType::Text => "Text",
            FieldType::Data => "Data",
            FieldType::Link => "Link",
            FieldType::DynamicLink => "Dynamic Link",
            FieldType::Password => "Password",
            FieldType::Select => "Select",
            FieldType::ReadOnly => "Read Only",
            FieldType::Attach => "Attach",
            FieldType::AttachImage => "Attach Image",
            FieldType::Signature => "Signature",
            FieldType::Color => "Color",
            FieldType::Barcode => "Barcode",
            FieldType::Geolocation => "Geolocation",
            FieldType::SectionBreak => "Section Break",
            FieldType::ColumnBreak => "Column Break",
            FieldType::Button => "Button",
            FieldType::Html => "HTML",
            FieldType::Table => "Table",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown field type '{}'", s))
    }
}
