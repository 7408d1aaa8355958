//! CREATE TABLE scanning
//!
//! Builds the table catalog from DDL text. The catalog is all-or-nothing: if
//! any `CREATE TABLE` statement fails to parse, no catalog is returned.

use sqld_core::{Column, Diagnostic, DiagnosticCode, DialectConfig, Location, Outcome, Schema, Table};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;
use std::path::Path;

use crate::lexer::{as_word, is_keyword, Cursor, SqlLexer, TokenStream};

/// Leading keywords of table-level constraint definitions
const TABLE_CONSTRAINT_KEYWORDS: &[Keyword] = &[
    Keyword::PRIMARY,
    Keyword::FOREIGN,
    Keyword::UNIQUE,
    Keyword::CHECK,
    Keyword::CONSTRAINT,
];

/// DDL parser producing a table catalog
pub struct SchemaParser {
    lexer: SqlLexer,
}

impl SchemaParser {
    /// Create a new schema parser with the generic dialect
    pub fn new() -> Self {
        Self {
            lexer: SqlLexer::new(),
        }
    }

    /// Create a schema parser for a configured dialect
    pub fn from_dialect(dialect: DialectConfig) -> Self {
        Self {
            lexer: SqlLexer::from_dialect(dialect),
        }
    }

    /// Parse DDL text into a catalog.
    ///
    /// Every `CREATE TABLE` keyword pair must belong to a well-formed
    /// statement and at least one table must be declared; otherwise the
    /// outcome carries only diagnostics.
    pub fn parse(&self, ddl: &str, file_path: Option<&Path>) -> Outcome<Schema> {
        let file = file_path.map(|p| p.display().to_string());
        let locate = |diag: Diagnostic, line: Option<usize>| match (&file, line) {
            (Some(file), Some(line)) => diag.with_location(Location::with_line(file.clone(), line)),
            (Some(file), None) => diag.with_location(Location::new(file.clone())),
            (None, _) => diag,
        };

        let stream = match self.lexer.tokenize(ddl) {
            Ok(stream) => stream,
            Err(e) => {
                return Outcome::failed(vec![locate(
                    Diagnostic::error(
                        DiagnosticCode::SchemaParseError,
                        format!("sqld schema invalid: {}", e.message),
                    ),
                    Some(e.line),
                )]);
            }
        };

        let mut tables = Vec::new();
        let mut declared = 0;
        let mut first_malformed = None;
        let mut pos = 0;

        while pos < stream.len() {
            let mut cursor = stream.cursor_at(pos);
            if !cursor.consume_keywords(&[Keyword::CREATE, Keyword::TABLE]) {
                pos += 1;
                continue;
            }

            declared += 1;
            match parse_create_table(&stream, &mut cursor) {
                Some(table) => {
                    tracing::debug!(table = %table.name, columns = table.columns.len(), "parsed table");
                    tables.push(table);
                    pos = cursor.position();
                }
                None => {
                    tracing::warn!(line = stream.line(pos), "malformed CREATE TABLE statement");
                    first_malformed.get_or_insert(stream.line(pos));
                    pos += 1;
                }
            }
        }

        let mut diagnostics = Vec::new();
        if tables.len() != declared {
            diagnostics.push(locate(
                Diagnostic::error(
                    DiagnosticCode::SchemaTableCountMismatch,
                    "sqld schema invalid: tables count does not match",
                ),
                first_malformed,
            ));
        }
        if tables.is_empty() {
            diagnostics.push(locate(
                Diagnostic::error(DiagnosticCode::SchemaEmpty, "sqld schema invalid: no tables found"),
                None,
            ));
        }

        Outcome::all_or_nothing(Schema::from_tables(tables), diagnostics)
    }
}

impl Default for SchemaParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the remainder of a statement after `CREATE TABLE`:
/// `[IF NOT EXISTS] name ( column, ... ) ;`
fn parse_create_table(stream: &TokenStream, cursor: &mut Cursor<'_>) -> Option<Table> {
    cursor.consume_keywords(&[Keyword::IF, Keyword::NOT, Keyword::EXISTS]);

    // schema-qualified names keep the last segment
    let mut name = cursor.next_ident()?;
    while cursor.consume_token(&Token::Period) {
        name = cursor.next_ident()?;
    }

    if !cursor.consume_token(&Token::LParen) {
        return None;
    }

    let mut columns = Vec::new();
    let mut start = cursor.position();
    let mut depth = 1usize;

    loop {
        let pos = cursor.position();
        match cursor.next()? {
            Token::LParen => depth += 1,
            Token::RParen if depth == 1 => {
                columns.extend(parse_column(stream, start, pos));
                break;
            }
            Token::RParen => depth -= 1,
            Token::Comma if depth == 1 => {
                columns.extend(parse_column(stream, start, pos));
                start = pos + 1;
            }
            _ => {}
        }
    }

    if columns.is_empty() || !cursor.consume_token(&Token::SemiColon) {
        return None;
    }

    Some(Table::new(name.value.clone(), columns))
}

/// Parse one column definition spanning significant tokens `start..end`.
///
/// The type is the type word plus an optional parenthesized argument list,
/// taken verbatim; anything after it (constraints, defaults) is ignored.
fn parse_column(stream: &TokenStream, start: usize, end: usize) -> Option<Column> {
    if end < start + 2 {
        return None;
    }

    let name_token = stream.get(start)?;
    if TABLE_CONSTRAINT_KEYWORDS.iter().any(|&kw| is_keyword(name_token, kw)) {
        return None;
    }
    let name = as_word(name_token)?;

    let type_pos = start + 1;
    as_word(stream.get(type_pos)?)?;

    let mut type_end = type_pos;
    if type_pos + 1 < end && stream.get(type_pos + 1) == Some(&Token::LParen) {
        let mut depth = 0usize;
        let close = (type_pos + 1..end).find(|&pos| {
            match stream.get(pos) {
                Some(Token::LParen) => depth += 1,
                Some(Token::RParen) => depth -= 1,
                _ => {}
            }
            depth == 0
        })?;
        type_end = close;
    }

    Some(Column::new(name.value.clone(), stream.text(type_pos, type_end)))
}
