//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Configuration (1xxx)
    /// A configuration field is missing, not an array, or empty
    ConfigInvalidField,

    // Schema catalog (2xxx)
    /// The DDL text could not be tokenized
    SchemaParseError,

    /// Number of CREATE TABLE keywords differs from the statements parsed
    SchemaTableCountMismatch,

    /// The schema declares no tables at all
    SchemaEmpty,

    /// The same table is declared by more than one schema file
    SchemaDuplicateTable,

    // Query resolution (3xxx)
    /// The query text could not be tokenized
    QueryParseError,

    /// A `-- name:` header is malformed
    QueryInvalidAnnotation,

    /// A qualifier or FROM table is not in the catalog
    QueryTableNotFound,

    /// A referenced column does not exist on its table
    QueryColumnNotFound,

    /// A bare column is declared by more than one table in scope
    QueryAmbiguousColumn,

    /// SQL the resolver does not understand (reported, then skipped)
    QueryUnsupportedSyntax,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigInvalidField => "CONFIG_INVALID_FIELD",
            Self::SchemaParseError => "SCHEMA_PARSE_ERROR",
            Self::SchemaTableCountMismatch => "SCHEMA_TABLE_COUNT_MISMATCH",
            Self::SchemaEmpty => "SCHEMA_EMPTY",
            Self::SchemaDuplicateTable => "SCHEMA_DUPLICATE_TABLE",
            Self::QueryParseError => "QUERY_PARSE_ERROR",
            Self::QueryInvalidAnnotation => "QUERY_INVALID_ANNOTATION",
            Self::QueryTableNotFound => "QUERY_TABLE_NOT_FOUND",
            Self::QueryColumnNotFound => "QUERY_COLUMN_NOT_FOUND",
            Self::QueryAmbiguousColumn => "QUERY_AMBIGUOUS_COLUMN",
            Self::QueryUnsupportedSyntax => "QUERY_UNSUPPORTED_SYNTAX",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - reported but does not fail the run
    Warn,

    /// Error - invalidates the result it belongs to
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as given in the config
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Query block the diagnostic belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            query: None,
        }
    }

    /// Shorthand for an error-severity diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Shorthand for a warning-severity diagnostic
    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the owning query name
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
