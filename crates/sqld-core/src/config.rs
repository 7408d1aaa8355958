//! Configuration schema (sqld.json)

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::diagnostic::{Diagnostic, DiagnosticCode, Location};
use crate::outcome::Outcome;

/// File name looked up in the project directory
pub const CONFIG_FILE_NAME: &str = "sqld.json";

const INVALID_PREFIX: &str = "sqld config invalid";

/// SQL dialect used when tokenizing schema and query files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectConfig {
    /// Generic ANSI SQL
    Ansi,

    /// PostgreSQL SQL dialect
    Postgres,

    /// MySQL SQL dialect
    Mysql,

    /// SQLite SQL dialect
    Sqlite,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::Ansi
    }
}

impl DialectConfig {
    /// Parse a dialect name as written in sqld.json
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ansi" => Some(Self::Ansi),
            "postgres" => Some(Self::Postgres),
            "mysql" => Some(Self::Mysql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Schema (DDL) files, relative to the project root
    pub schemas: Vec<PathBuf>,

    /// Annotated query files, relative to the project root
    pub queries: Vec<PathBuf>,

    /// SQL dialect, `ansi` when absent
    pub dialect: DialectConfig,

    /// Project root path (for resolving relative paths)
    pub project_root: PathBuf,
}

impl Config {
    /// Parse and validate config text.
    ///
    /// Text that is not a JSON object is fatal and returned as `Err`. Field
    /// problems are collected: both `schemas` and `queries` are always checked,
    /// and the config is only produced when neither failed.
    pub fn parse(text: &str) -> Result<Outcome<Config>, ConfigError> {
        let raw: Value = serde_json::from_str(text)?;
        let Value::Object(object) = raw else {
            return Err(ConfigError::NotAnObject);
        };

        let mut diagnostics = Vec::new();
        let schemas = path_list(&object, "schemas", &mut diagnostics);
        let queries = path_list(&object, "queries", &mut diagnostics);
        let dialect = dialect(&object, &mut diagnostics);

        match (schemas, queries, dialect) {
            (Some(schemas), Some(queries), Some(dialect)) if diagnostics.is_empty() => {
                Ok(Outcome::ok(Config {
                    schemas,
                    queries,
                    dialect,
                    project_root: PathBuf::new(),
                }))
            }
            _ => Ok(Outcome::failed(diagnostics)),
        }
    }

    /// Load and validate `sqld.json` from a project directory
    pub fn from_dir(dir: &Path) -> Result<Outcome<Config>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut outcome = Self::parse(&contents)?;
        for diag in &mut outcome.diagnostics {
            diag.location = Some(Location::new(CONFIG_FILE_NAME));
        }
        Ok(outcome.map(|config| config.with_project_root(dir)))
    }

    /// Set the directory relative paths are resolved against
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Schema file paths joined onto the project root
    pub fn schema_paths(&self) -> Vec<PathBuf> {
        self.resolve_paths(&self.schemas)
    }

    /// Query file paths joined onto the project root
    pub fn query_paths(&self) -> Vec<PathBuf> {
        self.resolve_paths(&self.queries)
    }

    fn resolve_paths(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| self.project_root.join(p)).collect()
    }
}

/// Validate one array-of-paths field, pushing at most one diagnostic
fn path_list(
    object: &Map<String, Value>,
    field: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<PathBuf>> {
    let invalid = |reason: &str| {
        Diagnostic::error(
            DiagnosticCode::ConfigInvalidField,
            format!("{}: {} {}", INVALID_PREFIX, field, reason),
        )
    };

    let Some(Value::Array(items)) = object.get(field) else {
        diagnostics.push(invalid("must be an array"));
        return None;
    };

    if items.is_empty() {
        diagnostics.push(invalid("must not be empty"));
        return None;
    }

    let paths: Option<Vec<PathBuf>> = items
        .iter()
        .map(|item| item.as_str().map(PathBuf::from))
        .collect();

    if paths.is_none() {
        diagnostics.push(invalid("entries must be strings"));
    }

    paths
}

fn dialect(object: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) -> Option<DialectConfig> {
    let Some(value) = object.get("dialect") else {
        return Some(DialectConfig::default());
    };

    let parsed = value.as_str().and_then(DialectConfig::from_name);
    if parsed.is_none() {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::ConfigInvalidField,
            format!(
                "{}: dialect must be one of ansi, postgres, mysql, sqlite",
                INVALID_PREFIX
            ),
        ));
    }

    parsed
}

/// Config error types
///
/// These are fatal: no field-level validation is attempted after one of them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Parse error: config must be a JSON object")]
    NotAnObject,
}
