//! Catalog and query metadata types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::outcome::Outcome;

/// A column in a table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Raw SQL type text, e.g. `VARCHAR(255)`
    #[serde(rename = "type")]
    pub sql_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// A table declared by a `CREATE TABLE` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name as declared
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Find a column by name, ignoring case
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// The table catalog built from schema files
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Tables in source order
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Find a table by name, ignoring case
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Combine per-file catalogs in order.
    ///
    /// A table name declared in more than one catalog invalidates the merge.
    pub fn merge(schemas: impl IntoIterator<Item = Schema>) -> Outcome<Schema> {
        let mut merged = Schema::default();
        let mut diagnostics = Vec::new();

        for schema in schemas {
            for table in schema.tables {
                if merged.find_table(&table.name).is_some() {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticCode::SchemaDuplicateTable,
                        format!(
                            "sqld schema invalid: table `{}` is declared more than once",
                            table.name
                        ),
                    ));
                    continue;
                }
                merged.tables.push(table);
            }
        }

        if merged.is_empty() && diagnostics.is_empty() {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::SchemaEmpty,
                "sqld schema invalid: no tables found",
            ));
        }

        Outcome::all_or_nothing(merged, diagnostics)
    }
}

/// A bound placeholder resolved to a catalog column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Placeholder name without the leading `:`
    pub name: String,

    /// Column reference as written, e.g. `u.id`
    pub origin: String,

    /// Type copied from the resolved column
    #[serde(rename = "type")]
    pub sql_type: String,
}

/// An annotated query resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Name from the `-- name:` annotation
    pub name: String,

    /// Free-form annotation token (`many`, `one`, `exec`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Lowercased alias to table name, last declaration wins
    pub table_aliases: BTreeMap<String, String>,

    /// Bound parameters in order of appearance
    pub input: Vec<Parameter>,

    /// Projected columns in listed order
    pub output: Vec<Column>,
}
