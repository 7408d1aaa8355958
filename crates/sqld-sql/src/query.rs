//! Annotated query scanning
//!
//! A query file is a sequence of blocks, each opened by a `-- name: <Name> :<type>`
//! comment line. Every block is tokenized and resolved against the catalog on its
//! own, and all diagnostics are pooled. Resolution is permissive: a reference that
//! fails to resolve is reported and dropped, the rest of the query is still returned.

use sqld_core::{
    Column, Diagnostic, DiagnosticCode, DialectConfig, Location, Outcome, Parameter, Query, Schema,
};
use sqlparser::keywords::{Keyword, RESERVED_FOR_TABLE_ALIAS};
use sqlparser::tokenizer::{Token, Word};
use std::collections::BTreeMap;
use std::path::Path;

use crate::lexer::{as_word, is_keyword, SqlLexer, TokenStream};
use crate::resolver::{ColumnRef, NameResolver};

/// Clause keywords that end a table reference, on top of sqlparser's own list
const NON_ALIAS_KEYWORDS: &[Keyword] = &[
    Keyword::SET,
    Keyword::VALUES,
    Keyword::DEFAULT,
    Keyword::RETURNING,
    Keyword::WHERE,
    Keyword::ON,
    Keyword::USING,
];

/// Keywords joining the branches of a compound SELECT
const SET_OPERATORS: &[Keyword] = &[Keyword::UNION, Keyword::INTERSECT, Keyword::EXCEPT];

/// Parser for annotated query files
pub struct QueryParser {
    lexer: SqlLexer,
}

impl QueryParser {
    /// Create a new query parser with the generic dialect
    pub fn new() -> Self {
        Self {
            lexer: SqlLexer::new(),
        }
    }

    /// Create a query parser for a configured dialect
    pub fn from_dialect(dialect: DialectConfig) -> Self {
        Self {
            lexer: SqlLexer::from_dialect(dialect),
        }
    }

    /// Parse query text and resolve every annotated block against `catalog`.
    ///
    /// The returned outcome always carries the queries that could be built,
    /// alongside every diagnostic raised for any block.
    pub fn parse(&self, text: &str, catalog: &Schema, file_path: Option<&Path>) -> Outcome<Vec<Query>> {
        let file = file_path.map(|p| p.display().to_string());
        let at = |diag: Diagnostic, line: usize| match &file {
            Some(file) => diag.with_location(Location::with_line(file.clone(), line)),
            None => diag,
        };

        let mut queries = Vec::new();
        let mut diagnostics = Vec::new();

        for block in split_blocks(text) {
            let tokens = self.lexer.tokenize_from(&block.body, block.body_line);

            let (name, kind) = match block.annotation {
                Annotation::Header { name, kind } => (name, kind),
                Annotation::Invalid(comment) => {
                    diagnostics.push(at(
                        Diagnostic::error(
                            DiagnosticCode::QueryInvalidAnnotation,
                            format!("invalid query annotation: `--{}`", comment.trim_end()),
                        ),
                        block.header_line,
                    ));
                    continue;
                }
                Annotation::Missing => {
                    let first_sql_line = match &tokens {
                        Ok(stream) if stream.is_empty() => None,
                        Ok(stream) => Some(stream.line(0)),
                        Err(e) => Some(e.line),
                    };
                    if let Some(line) = first_sql_line {
                        diagnostics.push(at(
                            Diagnostic::warn(
                                DiagnosticCode::QueryUnsupportedSyntax,
                                "SQL before the first `-- name:` annotation is ignored",
                            ),
                            line,
                        ));
                    }
                    continue;
                }
            };

            let stream = match tokens {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(query = %name, line = e.line, "failed to tokenize query");
                    diagnostics.push(at(
                        Diagnostic::error(
                            DiagnosticCode::QueryParseError,
                            format!("failed to tokenize query: {}", e.message),
                        )
                        .with_query(name),
                        e.line,
                    ));
                    continue;
                }
            };

            let analysis = analyze(&stream, catalog);
            tracing::debug!(
                query = %name,
                inputs = analysis.input.len(),
                outputs = analysis.output.len(),
                "resolved query"
            );

            diagnostics.extend(
                analysis
                    .diagnostics
                    .into_iter()
                    .map(|(diag, pos)| at(diag.with_query(name.clone()), stream.line(pos))),
            );

            queries.push(Query {
                name,
                kind,
                table_aliases: analysis.table_aliases,
                input: analysis.input,
                output: analysis.output,
            });
        }

        Outcome::partial(queries, diagnostics)
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

/// The `-- name:` header of a block
#[derive(Debug, Clone, PartialEq, Eq)]
enum Annotation {
    Header { name: String, kind: String },
    /// Comment text of a header that starts with `name:` but is malformed
    Invalid(String),
    /// Text before the first header
    Missing,
}

impl Annotation {
    /// Recognize the text after `--` as a block header
    fn from_comment(comment: &str) -> Option<Self> {
        let rest = comment.trim_start().strip_prefix("name:")?;
        let mut parts = rest.split_whitespace();

        let header = match (parts.next(), parts.next().and_then(|k| k.strip_prefix(':'))) {
            (Some(name), Some(kind)) if !kind.is_empty() => Annotation::Header {
                name: name.to_string(),
                kind: kind.to_string(),
            },
            _ => Annotation::Invalid(comment.to_string()),
        };
        Some(header)
    }
}

struct Block {
    annotation: Annotation,
    header_line: usize,
    /// Source text after the header, up to the next one
    body: String,
    /// File line the body starts on
    body_line: usize,
}

/// Cut the source at every header line, before any tokenizing
fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current = Block {
        annotation: Annotation::Missing,
        header_line: 1,
        body: String::new(),
        body_line: 1,
    };

    for (index, line) in text.split('\n').enumerate() {
        let header = line
            .trim_start()
            .strip_prefix("--")
            .and_then(Annotation::from_comment);

        match header {
            Some(annotation) => {
                let line_no = index + 1;
                blocks.push(std::mem::replace(
                    &mut current,
                    Block {
                        annotation,
                        header_line: line_no,
                        body: String::new(),
                        body_line: line_no + 1,
                    },
                ));
            }
            None => {
                current.body.push_str(line);
                current.body.push('\n');
            }
        }
    }

    blocks.push(current);
    blocks
}

/// Whether a word can name a table or alias rather than start a clause
fn is_table_word(word: &Word) -> bool {
    word.quote_style.is_some()
        || !(RESERVED_FOR_TABLE_ALIAS.contains(&word.keyword)
            || NON_ALIAS_KEYWORDS.contains(&word.keyword))
}

/// Resolution result for one block
#[derive(Default)]
struct Analysis {
    table_aliases: BTreeMap<String, String>,
    input: Vec<Parameter>,
    output: Vec<Column>,
    /// Diagnostics with the significant token position they point at
    diagnostics: Vec<(Diagnostic, usize)>,
}

/// Resolve the first statement of a block.
///
/// Each branch of a compound SELECT gets its own scope; the output columns
/// come from the first branch.
fn analyze(stream: &TokenStream, catalog: &Schema) -> Analysis {
    let end = (0..stream.len())
        .find(|&pos| stream.get(pos) == Some(&Token::SemiColon))
        .unwrap_or(stream.len());

    let mut analysis = Analysis::default();
    for (index, (start, end)) in set_operation_branches(stream, end).into_iter().enumerate() {
        let branch = StatementAnalyzer::new(stream, catalog, start, end).run(index == 0);
        analysis.table_aliases.extend(branch.table_aliases);
        analysis.input.extend(branch.input);
        analysis.output.extend(branch.output);
        analysis.diagnostics.extend(branch.diagnostics);
    }
    analysis
}

/// Split `0..end` on top-level UNION / INTERSECT / EXCEPT
fn set_operation_branches(stream: &TokenStream, end: usize) -> Vec<(usize, usize)> {
    let mut branches = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < end {
        match stream.get(pos) {
            Some(Token::LParen) => depth += 1,
            Some(Token::RParen) => depth = depth.saturating_sub(1),
            Some(token) if depth == 0 && SET_OPERATORS.iter().any(|&kw| is_keyword(token, kw)) => {
                branches.push((start, pos));
                let quantifier = stream
                    .get(pos + 1)
                    .is_some_and(|t| is_keyword(t, Keyword::ALL) || is_keyword(t, Keyword::DISTINCT));
                if quantifier {
                    pos += 1;
                }
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }

    branches.push((start, end));
    branches
}

/// A placeholder paired with the column it is compared to
struct Binding {
    param: String,
    reference: ColumnRef,
    origin: String,
    pos: usize,
}

/// Resolves one SELECT branch or write statement spanning `start..end`
struct StatementAnalyzer<'a> {
    stream: &'a TokenStream,
    start: usize,
    /// One past the last significant token of the statement
    end: usize,
    resolver: NameResolver<'a>,
    /// First table named after a top-level FROM, the target of `SELECT *`
    from_table: Option<String>,
    /// INSERT target table and its column list
    insert: Option<(String, Vec<String>)>,
    diagnostics: Vec<(Diagnostic, usize)>,
}

impl<'a> StatementAnalyzer<'a> {
    fn new(stream: &'a TokenStream, catalog: &'a Schema, start: usize, end: usize) -> Self {
        Self {
            stream,
            start,
            end,
            resolver: NameResolver::new(catalog),
            from_table: None,
            insert: None,
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self, project: bool) -> Analysis {
        self.collect_tables();
        let input = self.collect_parameters();
        let output = if project { self.collect_output() } else { Vec::new() };

        Analysis {
            table_aliases: self.resolver.aliases().clone(),
            input,
            output,
            diagnostics: self.diagnostics,
        }
    }

    fn token(&self, pos: usize) -> Option<&'a Token> {
        if (self.start..self.end).contains(&pos) {
            self.stream.get(pos)
        } else {
            None
        }
    }

    fn keyword_at(&self, pos: usize, keyword: Keyword) -> bool {
        self.token(pos).is_some_and(|t| is_keyword(t, keyword))
    }

    fn report(&mut self, diag: Diagnostic, pos: usize) {
        self.diagnostics.push((diag, pos));
    }

    /// Bring every FROM / JOIN / UPDATE / INSERT INTO table into scope
    fn collect_tables(&mut self) {
        // one entry per open paren: whether it opens a subquery
        let mut parens: Vec<bool> = Vec::new();

        for pos in self.start..self.end {
            match self.token(pos) {
                Some(Token::LParen) => {
                    let subquery =
                        self.keyword_at(pos + 1, Keyword::SELECT) || self.keyword_at(pos + 1, Keyword::WITH);
                    parens.push(subquery);
                    continue;
                }
                Some(Token::RParen) => {
                    parens.pop();
                    continue;
                }
                _ => {}
            }

            // `EXTRACT(YEAR FROM col)`, `TRIM(x FROM col)` and the like
            if parens.last() == Some(&false) {
                continue;
            }
            let top_level = parens.is_empty();

            if self.keyword_at(pos, Keyword::FROM) {
                let mut next = pos + 1;
                while let Some((table, after)) = self.table_ref(next) {
                    if top_level {
                        self.from_table.get_or_insert(table);
                    }
                    if self.token(after) != Some(&Token::Comma) {
                        break;
                    }
                    next = after + 1;
                }
            } else if self.keyword_at(pos, Keyword::JOIN) || self.keyword_at(pos, Keyword::UPDATE) {
                self.table_ref(pos + 1);
            } else if self.keyword_at(pos, Keyword::INSERT) && self.keyword_at(pos + 1, Keyword::INTO) {
                if let Some((table, after)) = self.table_ref(pos + 2) {
                    let columns = self.insert_columns(&table, after, pos + 2);
                    self.insert = Some((table, columns));
                }
            }
        }
    }

    /// Parse `name [[AS] alias]` at `pos`, binding it in the resolver.
    /// Returns the table name and the position after the reference.
    fn table_ref(&mut self, pos: usize) -> Option<(String, usize)> {
        let mut pos = pos;
        let mut name = self.token(pos).and_then(as_word).filter(|w| is_table_word(w))?;
        while self.token(pos + 1) == Some(&Token::Period) {
            name = self.token(pos + 2).and_then(as_word)?;
            pos += 2;
        }
        pos += 1;

        let explicit = self.keyword_at(pos, Keyword::AS);
        let alias_pos = if explicit { pos + 1 } else { pos };
        let alias = self
            .token(alias_pos)
            .and_then(as_word)
            .filter(|word| explicit || is_table_word(word));

        let after = if alias.is_some() { alias_pos + 1 } else { pos };
        self.resolver
            .bind_table(&name.value, alias.map(|word| word.value.as_str()));

        Some((name.value.clone(), after))
    }

    /// Column list of `INSERT INTO t (a, b, ...)` starting at `pos`.
    ///
    /// Without a list, the table's declared column order is used.
    fn insert_columns(&mut self, table: &str, pos: usize, table_pos: usize) -> Vec<String> {
        if self.token(pos) != Some(&Token::LParen) {
            return match self.resolver.resolve_table(table) {
                Ok(table) => table.columns.iter().map(|c| c.name.clone()).collect(),
                Err(e) => {
                    self.report(e.to_diagnostic(), table_pos);
                    Vec::new()
                }
            };
        }

        let mut columns = Vec::new();
        let mut pos = pos + 1;
        while let Some(token) = self.token(pos) {
            match token {
                Token::RParen => break,
                Token::Word(word) => columns.push(word.value.clone()),
                _ => {}
            }
            pos += 1;
        }
        columns
    }

    /// Placeholder name at `pos`: `:name` (or a `:name` placeholder token)
    fn placeholder(&self, pos: usize) -> Option<String> {
        match self.token(pos)? {
            Token::Colon => self.token(pos + 1).and_then(as_word).map(|w| w.value.clone()),
            Token::Placeholder(p) => p.strip_prefix(':').map(str::to_string),
            _ => None,
        }
    }

    /// Column reference ending at `pos` (inclusive), with its start position
    fn column_ref_ending_at(&self, pos: usize) -> Option<(ColumnRef, usize)> {
        let column = self.token(pos).and_then(as_word)?;
        if let Some(qualifier_pos) = pos.checked_sub(2) {
            if self.token(pos - 1) == Some(&Token::Period) {
                if let Some(qualifier) = self.token(qualifier_pos).and_then(as_word) {
                    return Some((
                        ColumnRef::qualified(qualifier.value.clone(), column.value.clone()),
                        qualifier_pos,
                    ));
                }
            }
        }
        Some((ColumnRef::bare(column.value.clone()), pos))
    }

    /// Find the column a placeholder at `pos` is compared to
    fn comparison_binding(&self, pos: usize) -> Option<ColumnRef> {
        let comparator = pos.checked_sub(1)?;
        let is_comparator = match self.token(comparator)? {
            Token::Eq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq | Token::Neq => true,
            token => is_keyword(token, Keyword::LIKE) || is_keyword(token, Keyword::ILIKE),
        };
        if !is_comparator {
            return None;
        }

        // `col NOT LIKE :x`
        let mut column_end = comparator.checked_sub(1)?;
        if is_keyword(self.token(comparator)?, Keyword::LIKE) && self.keyword_at(column_end, Keyword::NOT) {
            column_end = column_end.checked_sub(1)?;
        }

        self.column_ref_ending_at(column_end).map(|(reference, _)| reference)
    }

    /// Placeholders of `INSERT ... VALUES (...)` mapped to the insert columns
    fn insert_bindings(&self) -> Vec<(usize, String)> {
        let Some((_, columns)) = &self.insert else {
            return Vec::new();
        };
        let Some(values) = (self.start..self.end).find(|&pos| self.keyword_at(pos, Keyword::VALUES)) else {
            return Vec::new();
        };
        if self.token(values + 1) != Some(&Token::LParen) {
            return Vec::new();
        }

        let mut bindings = Vec::new();
        let mut index = 0;
        let mut depth = 0usize;
        let mut pos = values + 2;
        while let Some(token) = self.token(pos) {
            match token {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => break,
                Token::RParen => depth -= 1,
                Token::Comma if depth == 0 => index += 1,
                _ => {
                    if depth == 0 && self.placeholder(pos).is_some() {
                        if let Some(column) = columns.get(index) {
                            bindings.push((pos, column.clone()));
                        }
                    }
                }
            }
            pos += 1;
        }
        bindings
    }

    fn collect_parameters(&mut self) -> Vec<Parameter> {
        let inserted = self.insert_bindings();
        let mut bindings = Vec::new();
        let mut unbound = Vec::new();

        for pos in self.start..self.end {
            let Some(param) = self.placeholder(pos) else {
                continue;
            };

            let found = inserted
                .iter()
                .find(|(at, _)| *at == pos)
                .map(|(_, column)| {
                    let table = self.insert.as_ref().map(|(t, _)| t.clone()).unwrap_or_default();
                    (ColumnRef::qualified(table, column.clone()), column.clone())
                })
                .or_else(|| {
                    self.comparison_binding(pos)
                        .map(|reference| (reference.clone(), reference.to_string()))
                });

            match found {
                Some((reference, origin)) => bindings.push(Binding {
                    param,
                    reference,
                    origin,
                    pos,
                }),
                None => unbound.push((param, pos)),
            }
        }

        for (param, pos) in unbound {
            self.report(
                Diagnostic::warn(
                    DiagnosticCode::QueryUnsupportedSyntax,
                    format!("parameter `:{}` is not bound to a column comparison", param),
                ),
                pos,
            );
        }

        let mut input = Vec::new();
        for binding in bindings {
            match self.resolver.resolve_column(&binding.reference) {
                Ok((_, column)) => input.push(Parameter {
                    name: binding.param,
                    origin: binding.origin,
                    sql_type: column.sql_type.clone(),
                }),
                Err(e) => self.report(e.to_diagnostic(), binding.pos),
            }
        }
        input
    }

    /// Resolve the projection of a SELECT, or the RETURNING list of a write
    fn collect_output(&mut self) -> Vec<Column> {
        if self.keyword_at(self.start, Keyword::WITH) {
            self.report(
                Diagnostic::warn(
                    DiagnosticCode::QueryUnsupportedSyntax,
                    "common table expressions are not resolved",
                ),
                self.start,
            );
            return Vec::new();
        }

        let start = if self.keyword_at(self.start, Keyword::SELECT) {
            let mut pos = self.start + 1;
            if self.keyword_at(pos, Keyword::DISTINCT) || self.keyword_at(pos, Keyword::ALL) {
                pos += 1;
            }
            pos
        } else {
            match (self.start..self.end).find(|&pos| self.keyword_at(pos, Keyword::RETURNING)) {
                Some(pos) => pos + 1,
                None => return Vec::new(),
            }
        };

        let mut output = Vec::new();
        for (item_start, item_end) in self.projection_items(start) {
            self.resolve_item(item_start, item_end, &mut output);
        }
        output
    }

    /// Split the list at `start` into items on depth-zero commas, stopping at
    /// a depth-zero FROM or the end of the statement
    fn projection_items(&self, start: usize) -> Vec<(usize, usize)> {
        let mut items = Vec::new();
        let mut item_start = start;
        let mut depth = 0usize;
        let mut pos = start;

        while let Some(token) = self.token(pos) {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                Token::Comma if depth == 0 => {
                    items.push((item_start, pos));
                    item_start = pos + 1;
                }
                token if depth == 0 && is_keyword(token, Keyword::FROM) => break,
                _ => {}
            }
            pos += 1;
        }

        if item_start < pos {
            items.push((item_start, pos));
        }
        items
    }

    /// Resolve one projection item spanning `start..end`
    fn resolve_item(&mut self, start: usize, end: usize, output: &mut Vec<Column>) {
        let len = end - start;

        // *
        if len == 1 && self.token(start) == Some(&Token::Mul) {
            match self.from_table.clone() {
                Some(table) => self.expand_wildcard(&table, start, output),
                None => self.report(
                    Diagnostic::warn(
                        DiagnosticCode::QueryUnsupportedSyntax,
                        "`*` has no FROM table to expand",
                    ),
                    start,
                ),
            }
            return;
        }

        // alias.*
        if len == 3
            && self.token(start + 1) == Some(&Token::Period)
            && self.token(start + 2) == Some(&Token::Mul)
        {
            if let Some(qualifier) = self.token(start).and_then(as_word) {
                self.expand_wildcard(&qualifier.value, start, output);
                return;
            }
        }

        match self.column_item(start, end) {
            Some((reference, alias)) => match self.resolver.resolve_column(&reference) {
                Ok((_, column)) => output.push(Column::new(
                    alias.unwrap_or_else(|| column.name.clone()),
                    column.sql_type.clone(),
                )),
                Err(e) => self.report(e.to_diagnostic(), start),
            },
            None => {
                let text = self.stream.text(start, end - 1);
                self.report(
                    Diagnostic::warn(
                        DiagnosticCode::QueryUnsupportedSyntax,
                        format!("unsupported projection expression `{}`", text.trim()),
                    ),
                    start,
                );
            }
        }
    }

    /// `[q.]column [[AS] alias]` spanning exactly `start..end`
    fn column_item(&self, start: usize, end: usize) -> Option<(ColumnRef, Option<String>)> {
        let qualified = self.token(start + 1) == Some(&Token::Period);
        let column_pos = if qualified { start + 2 } else { start };
        if column_pos >= end {
            return None;
        }

        let (reference, _) = self.column_ref_ending_at(column_pos)?;
        if reference.qualifier.is_some() != qualified {
            return None;
        }

        let mut pos = column_pos + 1;
        if pos == end {
            return Some((reference, None));
        }

        if self.keyword_at(pos, Keyword::AS) {
            pos += 1;
        }
        let alias = self.token(pos).and_then(as_word)?;
        if pos + 1 != end {
            return None;
        }
        Some((reference, Some(alias.value.clone())))
    }

    fn expand_wildcard(&mut self, qualifier: &str, pos: usize, output: &mut Vec<Column>) {
        match self.resolver.resolve_table(qualifier) {
            Ok(table) => output.extend(table.columns.iter().cloned()),
            Err(e) => self.report(e.to_diagnostic(), pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqld_core::Table;

    fn catalog() -> Schema {
        Schema::from_tables(vec![
            Table::new(
                "users",
                vec![Column::new("id", "INT"), Column::new("name", "VARCHAR(255)")],
            ),
            Table::new(
                "posts",
                vec![
                    Column::new("id", "INT"),
                    Column::new("title", "VARCHAR(255)"),
                    Column::new("content", "TEXT"),
                    Column::new("user_id", "INT"),
                ],
            ),
        ])
    }

    fn parse(text: &str) -> Outcome<Vec<Query>> {
        QueryParser::new().parse(text, &catalog(), None)
    }

    fn messages(outcome: &Outcome<Vec<Query>>) -> Vec<&str> {
        outcome.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn annotation_header() {
        assert_eq!(
            Annotation::from_comment(" name: listPosts :many\n"),
            Some(Annotation::Header {
                name: "listPosts".to_string(),
                kind: "many".to_string(),
            })
        );
        assert!(matches!(
            Annotation::from_comment(" name: listPosts many\n"),
            Some(Annotation::Invalid(_))
        ));
        assert_eq!(Annotation::from_comment(" just a comment\n"), None);
    }

    #[test]
    fn splits_blocks_at_headers() {
        let outcome = parse(
            r#"
            -- name: getUser :one
            SELECT * FROM users WHERE id = :id;

            -- name: deletePost :exec
            DELETE FROM posts WHERE id = :id;
        "#,
        );

        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let queries = outcome.value.unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!((queries[0].name.as_str(), queries[0].kind.as_str()), ("getUser", "one"));
        assert_eq!((queries[1].name.as_str(), queries[1].kind.as_str()), ("deletePost", "exec"));
        assert!(queries[1].output.is_empty());
        assert_eq!(queries[1].input[0].sql_type, "INT");
    }

    #[test]
    fn alias_without_as_and_with_as() {
        let outcome = parse(
            "-- name: q :many\nSELECT u.name FROM users AS u JOIN posts p ON p.user_id = u.id;",
        );
        let query = &outcome.value.unwrap()[0];
        assert_eq!(query.table_aliases.get("u").map(String::as_str), Some("users"));
        assert_eq!(query.table_aliases.get("p").map(String::as_str), Some("posts"));
    }

    #[test]
    fn table_without_alias_adds_no_entry() {
        let outcome = parse("-- name: q :many\nSELECT name FROM users WHERE id = :id;");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let query = &outcome.value.unwrap()[0];
        assert!(query.table_aliases.is_empty());
        assert_eq!(query.input[0].origin, "id");
        assert_eq!(query.output, vec![Column::new("name", "VARCHAR(255)")]);
    }

    #[test]
    fn redeclared_alias_keeps_last_table() {
        let outcome = parse(
            "-- name: q :many\nSELECT t.title FROM users t JOIN posts t ON t.user_id = 1;",
        );
        let query = &outcome.value.unwrap()[0];
        assert_eq!(query.table_aliases.get("t").map(String::as_str), Some("posts"));
        assert_eq!(query.output, vec![Column::new("title", "VARCHAR(255)")]);
    }

    #[test]
    fn supported_comparators() {
        let outcome = parse(
            r#"-- name: q :many
            SELECT id FROM posts
            WHERE id > :after AND id <= :upto AND user_id <> :other AND title NOT LIKE :pattern;"#,
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let names: Vec<_> = outcome.value.unwrap()[0]
            .input
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["after", "upto", "other", "pattern"]);
    }

    #[test]
    fn unbound_placeholder_is_a_warning() {
        let outcome = parse("-- name: q :many\nSELECT id FROM posts WHERE id IN (:ids) LIMIT :n;");
        assert_eq!(
            messages(&outcome),
            vec![
                "parameter `:ids` is not bound to a column comparison",
                "parameter `:n` is not bound to a column comparison",
            ]
        );
        assert!(!outcome.has_errors());
        assert!(outcome.value.unwrap()[0].input.is_empty());
    }

    #[test]
    fn unknown_alias_drops_only_that_parameter() {
        let outcome = parse(
            "-- name: q :many\nSELECT p.title FROM posts p WHERE x.id = :id AND p.user_id = :user;",
        );
        assert_eq!(messages(&outcome), vec!["table `x` not found on schema"]);
        let diag = &outcome.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::QueryTableNotFound);
        assert_eq!(diag.query.as_deref(), Some("q"));

        let query = &outcome.value.unwrap()[0];
        assert_eq!(query.input.len(), 1);
        assert_eq!(query.input[0].name, "user");
        assert_eq!(query.input[0].origin, "p.user_id");
    }

    #[test]
    fn unknown_column_is_reported() {
        let outcome = parse("-- name: q :one\nSELECT u.email, u.name FROM users u;");
        assert_eq!(messages(&outcome), vec!["column `email` not found on table `users`"]);
        assert_eq!(
            outcome.value.unwrap()[0].output,
            vec![Column::new("name", "VARCHAR(255)")]
        );
    }

    #[test]
    fn ambiguous_bare_column() {
        let outcome = parse(
            "-- name: q :many\nSELECT id FROM users u JOIN posts p ON p.user_id = u.id;",
        );
        assert_eq!(messages(&outcome), vec!["column `id` is ambiguous"]);
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::QueryAmbiguousColumn);
    }

    #[test]
    fn qualified_wildcard_and_aliases() {
        let outcome = parse(
            "-- name: q :many\nSELECT p.*, u.name AS author FROM posts p JOIN users u ON u.id = p.user_id;",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let output = &outcome.value.unwrap()[0].output;
        let names: Vec<_> = output.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "content", "user_id", "author"]);
        assert_eq!(output[4].sql_type, "VARCHAR(255)");
    }

    #[test]
    fn wildcard_on_unknown_table() {
        let outcome = parse("-- name: q :many\nSELECT * FROM comments;");
        assert_eq!(messages(&outcome), vec!["table `comments` not found on schema"]);
        assert!(outcome.value.unwrap()[0].output.is_empty());
    }

    #[test]
    fn expressions_are_skipped_with_a_warning() {
        let outcome = parse("-- name: q :one\nSELECT COUNT(*), name FROM users;");
        assert_eq!(messages(&outcome), vec!["unsupported projection expression `COUNT(*)`"]);
        assert_eq!(
            outcome.value.unwrap()[0].output,
            vec![Column::new("name", "VARCHAR(255)")]
        );
    }

    #[test]
    fn update_binds_set_and_where() {
        let outcome = parse("-- name: rename :exec\nUPDATE users SET name = :name WHERE id = :id;");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let input = &outcome.value.unwrap()[0].input;
        assert_eq!(
            input.iter().map(|p| (p.name.as_str(), p.sql_type.as_str())).collect::<Vec<_>>(),
            vec![("name", "VARCHAR(255)"), ("id", "INT")]
        );
    }

    #[test]
    fn insert_binds_positionally() {
        let outcome = parse(
            "-- name: createPost :one\nINSERT INTO posts (title, user_id) VALUES (:title, :author) RETURNING id;",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let query = &outcome.value.unwrap()[0];
        assert_eq!(
            query.input,
            vec![
                Parameter {
                    name: "title".to_string(),
                    origin: "title".to_string(),
                    sql_type: "VARCHAR(255)".to_string(),
                },
                Parameter {
                    name: "author".to_string(),
                    origin: "user_id".to_string(),
                    sql_type: "INT".to_string(),
                },
            ]
        );
        assert_eq!(query.output, vec![Column::new("id", "INT")]);
    }

    #[test]
    fn invalid_annotation_skips_block() {
        let outcome = parse(
            "-- name: broken\nSELECT * FROM users;\n-- name: ok :many\nSELECT * FROM users;",
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::QueryInvalidAnnotation);
        let queries = outcome.value.unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].name, "ok");
    }

    #[test]
    fn sql_before_first_header_is_ignored() {
        let outcome = parse("SELECT 1;\n-- name: ok :many\nSELECT * FROM users;");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::QueryUnsupportedSyntax);
        assert_eq!(outcome.value.unwrap().len(), 1);
    }

    #[test]
    fn diagnostics_carry_file_and_line() {
        let outcome = QueryParser::new().parse(
            "-- name: q :one\nSELECT u.name\nFROM users u\nWHERE u.missing = :id;",
            &catalog(),
            Some(Path::new("queries.sql")),
        );
        assert_eq!(
            outcome.diagnostics[0].location,
            Some(Location::with_line("queries.sql", 4))
        );
    }

    #[test]
    fn tokenizer_failure_is_confined_to_its_block() {
        let outcome = QueryParser::new().parse(
            "-- name: good :one\nSELECT name FROM users WHERE id = :id;\n-- name: bad :one\nSELECT name FROM users WHERE name = 'oops;",
            &catalog(),
            Some(Path::new("queries.sql")),
        );

        assert_eq!(outcome.diagnostics.len(), 1);
        let diag = &outcome.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::QueryParseError);
        assert_eq!(diag.query.as_deref(), Some("bad"));
        assert_eq!(diag.location, Some(Location::with_line("queries.sql", 4)));

        let queries = outcome.value.unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].name, "good");
        assert_eq!(queries[0].input[0].sql_type, "INT");
    }

    #[test]
    fn from_inside_function_call_is_not_a_table() {
        let outcome = parse("-- name: q :many\nSELECT EXTRACT(YEAR FROM created) AS y, * FROM users;");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::QueryUnsupportedSyntax);

        let query = &outcome.value.unwrap()[0];
        assert_eq!(
            query.output,
            vec![Column::new("id", "INT"), Column::new("name", "VARCHAR(255)")]
        );
    }

    #[test]
    fn subquery_tables_are_in_scope() {
        let outcome = parse(
            "-- name: q :many\nSELECT name FROM users WHERE id IN (SELECT user_id FROM posts WHERE title = :title);",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let query = &outcome.value.unwrap()[0];
        assert_eq!(query.input[0].sql_type, "VARCHAR(255)");
        assert_eq!(query.output, vec![Column::new("name", "VARCHAR(255)")]);
    }

    #[test]
    fn union_branches_resolve_separately() {
        let outcome = parse(
            "-- name: q :many\nSELECT id FROM users WHERE id = :id UNION ALL SELECT id FROM posts WHERE id = :pid;",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

        let query = &outcome.value.unwrap()[0];
        assert_eq!(
            query.input.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "pid"]
        );
        assert_eq!(query.output, vec![Column::new("id", "INT")]);
    }

    #[test]
    fn insert_without_column_list_uses_declared_order() {
        let outcome = parse("-- name: createUser :exec\nINSERT INTO users VALUES (:id, :name);");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

        let input = &outcome.value.unwrap()[0].input;
        assert_eq!(
            input.iter().map(|p| (p.name.as_str(), p.sql_type.as_str())).collect::<Vec<_>>(),
            vec![("id", "INT"), ("name", "VARCHAR(255)")]
        );
    }

    #[test]
    fn insert_into_unknown_table_is_reported() {
        let outcome = parse("-- name: q :exec\nINSERT INTO comments VALUES (:id);");
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::QueryTableNotFound);
    }
}
