//! sqld core
//!
//! Core domain model: catalog and query metadata, configuration, and the
//! diagnostic types every stage reports through.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod outcome;
pub mod schema;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use outcome::Outcome;
pub use schema::{Column, Table, Schema, Parameter, Query};
pub use report::{Report, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, DialectConfig, CONFIG_FILE_NAME};
