//! Name resolution for table aliases and column references
//!
//! Resolves names in one query against the table catalog.

use sqld_core::{Column, Diagnostic, DiagnosticCode, Schema, Table};
use std::collections::BTreeMap;

/// A column reference as written: `[qualifier.]column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias before the dot
    pub qualifier: Option<String>,

    /// Column name
    pub column: String,
}

impl ColumnRef {
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}.{}", qualifier, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Per-query name resolver
///
/// Tracks the tables a statement brings into scope and the aliases they are
/// bound to. Alias keys are lowercased; a redeclared alias keeps the last table.
pub struct NameResolver<'a> {
    catalog: &'a Schema,

    /// Map of lowercased alias to table name as written
    aliases: BTreeMap<String, String>,

    /// Tables in scope, in order of appearance
    tables: Vec<String>,
}

impl<'a> NameResolver<'a> {
    /// Create a new name resolver over a catalog
    pub fn new(catalog: &'a Schema) -> Self {
        Self {
            catalog,
            aliases: BTreeMap::new(),
            tables: Vec::new(),
        }
    }

    /// Bring a table into scope, optionally under an alias
    pub fn bind_table(&mut self, table: &str, alias: Option<&str>) {
        if !self.tables.iter().any(|t| t.eq_ignore_ascii_case(table)) {
            self.tables.push(table.to_string());
        }

        if let Some(alias) = alias {
            self.aliases.insert(alias.to_lowercase(), table.to_string());
        }
    }

    /// Get all resolved aliases
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Tables in scope, in order of appearance
    pub fn tables_in_scope(&self) -> &[String] {
        &self.tables
    }

    /// Table name an alias or table qualifier refers to
    pub fn table_name<'q>(&'q self, qualifier: &'q str) -> &'q str {
        self.aliases
            .get(&qualifier.to_lowercase())
            .map(String::as_str)
            .unwrap_or(qualifier)
    }

    /// Resolve an alias or table name to its catalog table
    pub fn resolve_table(&self, qualifier: &str) -> Result<&'a Table, ResolveError> {
        let name = self.table_name(qualifier);
        self.catalog
            .find_table(name)
            .ok_or_else(|| ResolveError::TableNotFound(name.to_string()))
    }

    /// Resolve a column reference to its table and column.
    ///
    /// Bare columns resolve only when exactly one in-scope table declares them.
    pub fn resolve_column(&self, reference: &ColumnRef) -> Result<(&'a Table, &'a Column), ResolveError> {
        if let Some(qualifier) = &reference.qualifier {
            let table = self.resolve_table(qualifier)?;
            return table
                .find_column(&reference.column)
                .map(|column| (table, column))
                .ok_or_else(|| ResolveError::ColumnNotFound {
                    column: reference.column.clone(),
                    table: table.name.clone(),
                });
        }

        if let [only] = self.tables.as_slice() {
            return self.resolve_column(&ColumnRef::qualified(only.clone(), reference.column.clone()));
        }

        let mut matches = self
            .tables
            .iter()
            .filter_map(|name| self.catalog.find_table(name))
            .filter_map(|table| table.find_column(&reference.column).map(|c| (table, c)));

        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (Some(_), Some(_)) => Err(ResolveError::AmbiguousColumn(reference.column.clone())),
            (None, _) => Err(ResolveError::ColumnNotInScope(reference.column.clone())),
        }
    }
}

/// Name resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("table `{0}` not found on schema")]
    TableNotFound(String),

    #[error("column `{column}` not found on table `{table}`")]
    ColumnNotFound { column: String, table: String },

    #[error("column `{0}` not found in any table in scope")]
    ColumnNotInScope(String),

    #[error("column `{0}` is ambiguous")]
    AmbiguousColumn(String),
}

impl ResolveError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::TableNotFound(_) => DiagnosticCode::QueryTableNotFound,
            Self::ColumnNotFound { .. } | Self::ColumnNotInScope(_) => DiagnosticCode::QueryColumnNotFound,
            Self::AmbiguousColumn(_) => DiagnosticCode::QueryAmbiguousColumn,
        }
    }

    /// Convert to an error diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}
