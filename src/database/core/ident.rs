//! SQL identifiers
//!
//! Table and column names are the only text spliced into generated SQL.
//! `Ident` can only be built through validation, so a value that reaches a
//! query as an identifier is known to be a plain word. It is written
//! double-quoted, which lets keywords such as `order` or `from` name tables
//! and columns.

use anyhow::{anyhow, Result};
use std::fmt;

/// A validated table or column name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Validate `name` as `[A-Za-z_][A-Za-z0-9_]*`
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(Ident(name.to_string()))
        } else {
            Err(anyhow!("Invalid SQL identifier '{}'", name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Quoted form, ready to splice into SQL
impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Join identifiers into a comma-separated column list
pub fn join_idents(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(Ident::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
