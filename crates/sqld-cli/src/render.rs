//! Terminal rendering for reports

use colored::Colorize;
use sqld_core::{Diagnostic, Query, Report, Schema, Severity};
use std::fmt::Write;

/// Render the resolved catalog and queries, followed by any warnings
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(60).bright_blue());
    let _ = writeln!(out, "{}", "sqld Report".bold().bright_blue());
    let _ = writeln!(out, "{}", "=".repeat(60).bright_blue());
    let _ = writeln!(out, "Version: {}", report.version);
    let _ = writeln!(out);

    if let Some(schema) = &report.schema {
        render_schema(&mut out, schema);
    }

    if !report.queries.is_empty() {
        let _ = writeln!(out, "{}", "Queries:".bold());
        for query in &report.queries {
            render_query(&mut out, query);
        }
        let _ = writeln!(out);
    }

    out.push_str(&render_diagnostics(report));
    out
}

fn render_schema(out: &mut String, schema: &Schema) {
    let _ = writeln!(out, "{}", "Tables:".bold());
    for table in &schema.tables {
        let _ = writeln!(out, "  {}", table.name.green());
        for column in &table.columns {
            let _ = writeln!(out, "    {} {}", column.name, column.sql_type.dimmed());
        }
    }
    let _ = writeln!(out);
}

fn render_query(out: &mut String, query: &Query) {
    let _ = writeln!(out, "  {} :{}", query.name.green().bold(), query.kind);

    if !query.table_aliases.is_empty() {
        let aliases: Vec<_> = query
            .table_aliases
            .iter()
            .map(|(alias, table)| format!("{} -> {}", alias, table))
            .collect();
        let _ = writeln!(out, "    aliases: {}", aliases.join(", "));
    }

    for param in &query.input {
        let _ = writeln!(
            out,
            "    in  :{} {} ({})",
            param.name,
            param.sql_type.dimmed(),
            param.origin
        );
    }
    for column in &query.output {
        let _ = writeln!(out, "    out {} {}", column.name, column.sql_type.dimmed());
    }
}

/// Render the summary counts and every diagnostic
pub fn render_diagnostics(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Summary:".bold());
    let _ = writeln!(out, "  Tables:   {}", report.summary.tables);
    let _ = writeln!(out, "  Queries:  {}", report.summary.queries);

    if report.summary.errors > 0 {
        let _ = writeln!(out, "  Errors:   {}", report.summary.errors.to_string().red().bold());
    } else {
        let _ = writeln!(out, "  Errors:   {}", report.summary.errors.to_string().green());
    }

    if report.summary.warnings > 0 {
        let _ = writeln!(out, "  Warnings: {}", report.summary.warnings.to_string().yellow());
    } else {
        let _ = writeln!(out, "  Warnings: {}", report.summary.warnings.to_string().green());
    }
    let _ = writeln!(out);

    if report.diagnostics.is_empty() {
        let _ = writeln!(out, "{}", "✓ No issues found!".green().bold());
        return out;
    }

    let _ = writeln!(out, "{}", "Diagnostics:".bold());
    for diag in &report.diagnostics {
        render_diagnostic(&mut out, diag);
    }
    out
}

fn render_diagnostic(out: &mut String, diag: &Diagnostic) {
    let severity = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    let _ = writeln!(out, "  [{}] {}: {}", severity, diag.code, diag.message);

    if let Some(location) = &diag.location {
        let _ = writeln!(out, "    at {}", location);
    }
    if let Some(query) = &diag.query {
        let _ = writeln!(out, "    in query {}", query);
    }
}
