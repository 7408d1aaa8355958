//! SQL scanning and resolution
//!
//! This crate handles:
//! - Tokenizing SQL using datafusion-sqlparser-rs
//! - Building the table catalog from CREATE TABLE statements
//! - Resolving table aliases, bound parameters and projections of annotated queries

pub mod lexer;
pub mod ddl;
pub mod resolver;
pub mod query;

pub use lexer::{SqlLexer, TokenStream, LexError};
pub use ddl::SchemaParser;
pub use resolver::{NameResolver, ColumnRef, ResolveError};
pub use query::QueryParser;
