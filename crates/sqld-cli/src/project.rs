//! Project loading: config, schema files, query files
//!
//! Reads every file named by `sqld.json` and runs each stage. A stage that
//! produces error diagnostics stops the pipeline, but every diagnostic of that
//! stage is kept so they can be reported together.

use anyhow::{Context, Result};
use sqld_core::{Config, Diagnostic, DiagnosticCode, Location, Outcome, Report, Schema};
use sqld_sql::{QueryParser, SchemaParser};
use std::path::Path;

/// Run the whole pipeline for the project in `dir`.
///
/// `Err` is reserved for fatal problems (missing or malformed `sqld.json`).
/// Validation failures come back inside the report.
pub fn check_project(dir: &Path) -> Result<Report> {
    let config = Config::from_dir(dir)?;
    let (config, diagnostics) = config.into_parts();
    let Some(config) = config else {
        return Ok(Report::from_diagnostics(diagnostics));
    };

    tracing::debug!(
        schemas = config.schemas.len(),
        queries = config.queries.len(),
        dialect = ?config.dialect,
        "loaded config"
    );

    let catalog = load_schema(&config)?;
    let (schema, mut diagnostics) = catalog.into_parts();
    let Some(schema) = schema else {
        return Ok(Report::from_diagnostics(diagnostics));
    };

    let parser = QueryParser::from_dialect(config.dialect);
    let mut queries = Vec::new();

    for (relative, path) in config.queries.iter().zip(config.query_paths()) {
        let Some(text) = read_source(&path, relative, DiagnosticCode::QueryParseError, &mut diagnostics) else {
            continue;
        };

        let outcome = parser.parse(&text, &schema, Some(relative));
        let (resolved, found) = outcome.into_parts();
        queries.extend(resolved.unwrap_or_default());
        diagnostics.extend(found);
    }

    let mut report = Report::new().with_schema(schema).with_queries(queries);
    report.extend_diagnostics(diagnostics);
    Ok(report)
}

/// Parse every schema file and merge the catalogs
fn load_schema(config: &Config) -> Result<Outcome<Schema>> {
    let parser = SchemaParser::from_dialect(config.dialect);
    let mut catalogs = Vec::new();
    let mut diagnostics = Vec::new();

    for (relative, path) in config.schemas.iter().zip(config.schema_paths()) {
        let Some(text) = read_source(&path, relative, DiagnosticCode::SchemaParseError, &mut diagnostics) else {
            continue;
        };

        let (schema, found) = parser.parse(&text, Some(relative)).into_parts();
        catalogs.extend(schema);
        diagnostics.extend(found);
    }

    if !diagnostics.is_empty() {
        return Ok(Outcome::failed(diagnostics));
    }

    Ok(Schema::merge(catalogs))
}

/// Read a source file, turning a read failure into a diagnostic
fn read_source(
    path: &Path,
    relative: &Path,
    code: DiagnosticCode,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    match std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())) {
        Ok(text) => Some(text),
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(code, format!("{:#}", e))
                    .with_location(Location::new(relative.display().to_string())),
            );
            None
        }
    }
}
