//! Tokenization using datafusion-sqlparser-rs
//!
//! Both the DDL and the query scanners work on the token stream produced here.
//! The tokenizer is a single forward pass over the input, so scanning cost is
//! linear no matter how the text is shaped.

use sqld_core::DialectConfig;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace, Word};

/// SQL tokenizer with configurable dialect
pub struct SqlLexer {
    dialect: Box<dyn Dialect>,
}

impl SqlLexer {
    /// Create a new lexer with the default (generic) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a lexer from a dialect config
    pub fn from_dialect(dialect: DialectConfig) -> Self {
        let dialect: Box<dyn Dialect> = match dialect {
            DialectConfig::Ansi => Box::new(GenericDialect {}),
            DialectConfig::Postgres => Box::new(PostgreSqlDialect {}),
            DialectConfig::Mysql => Box::new(MySqlDialect {}),
            DialectConfig::Sqlite => Box::new(SQLiteDialect {}),
        };
        Self { dialect }
    }

    /// Tokenize SQL text, keeping whitespace and comments as trivia
    pub fn tokenize(&self, sql: &str) -> Result<TokenStream, LexError> {
        self.tokenize_from(sql, 1)
    }

    /// Tokenize a fragment whose first line is line `first_line` of its file
    pub fn tokenize_from(&self, sql: &str, first_line: usize) -> Result<TokenStream, LexError> {
        let tokens = Tokenizer::new(&*self.dialect, sql)
            .tokenize()
            .map_err(|e| LexError {
                message: e.message,
                line: first_line + (e.location.line as usize).saturating_sub(1),
            })?;

        Ok(TokenStream::from_tokens(tokens, first_line))
    }
}

impl Default for SqlLexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokenizer failure (unterminated string, stray character, ...)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at line {line}")]
pub struct LexError {
    pub message: String,

    /// 1-indexed line in the file the fragment came from
    pub line: usize,
}

/// Raw tokens plus an index of the significant (non-trivia) ones
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    /// 1-indexed line each raw token starts on
    lines: Vec<usize>,
    /// Positions of non-trivia tokens in `tokens`
    significant: Vec<usize>,
}

impl TokenStream {
    /// Build a stream from raw tokens, the first of which starts on `first_line`
    pub fn from_tokens(tokens: Vec<Token>, first_line: usize) -> Self {
        let mut lines = Vec::with_capacity(tokens.len());
        let mut significant = Vec::new();
        let mut line = first_line;

        for (i, token) in tokens.iter().enumerate() {
            lines.push(line);
            if !is_trivia(token) {
                significant.push(i);
            }
            line += newlines(token);
        }

        Self {
            tokens,
            lines,
            significant,
        }
    }

    /// Number of significant tokens
    pub fn len(&self) -> usize {
        self.significant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.significant.is_empty()
    }

    /// Significant token at `pos`
    pub fn get(&self, pos: usize) -> Option<&Token> {
        self.significant.get(pos).map(|&i| &self.tokens[i])
    }

    /// Line the significant token at `pos` starts on
    pub fn line(&self, pos: usize) -> usize {
        self.significant
            .get(pos)
            .map(|&i| self.lines[i])
            .unwrap_or_else(|| self.lines.last().copied().unwrap_or(1))
    }

    /// Source text from significant token `start` through `end` inclusive,
    /// with the trivia between them preserved
    pub fn text(&self, start: usize, end: usize) -> String {
        match (self.significant.get(start), self.significant.get(end)) {
            (Some(&from), Some(&to)) if from <= to => {
                self.tokens[from..=to].iter().map(|t| t.to_string()).collect()
            }
            _ => String::new(),
        }
    }

    /// Cursor positioned at the first significant token
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor { stream: self, pos: 0 }
    }

    /// Cursor positioned at significant token `pos`
    pub fn cursor_at(&self, pos: usize) -> Cursor<'_> {
        Cursor { stream: self, pos }
    }
}

/// Forward-only reader over the significant tokens of a stream
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    stream: &'a TokenStream,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.stream.len()
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.stream.get(self.pos)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.stream.get(self.pos + n)
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        let token = self.stream.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn peek_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| is_keyword(t, keyword))
    }

    /// Consume the next token if it is `keyword`
    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the whole keyword sequence, or nothing
    pub fn consume_keywords(&mut self, keywords: &[Keyword]) -> bool {
        let matches = keywords
            .iter()
            .enumerate()
            .all(|(n, &kw)| self.peek_nth(n).is_some_and(|t| is_keyword(t, kw)));

        if matches {
            self.pos += keywords.len();
        }
        matches
    }

    /// Consume the next token if it equals `token`
    pub fn consume_token(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume an identifier (any word, quoted or not)
    pub fn next_ident(&mut self) -> Option<&'a Word> {
        let word = self.peek().and_then(as_word)?;
        self.pos += 1;
        Some(word)
    }
}

/// Whitespace and comments
pub fn is_trivia(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_) | Token::EOF)
}

pub fn as_word(token: &Token) -> Option<&Word> {
    match token {
        Token::Word(word) => Some(word),
        _ => None,
    }
}

/// Unquoted word matching `keyword`
pub fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.keyword == keyword)
}

fn newlines(token: &Token) -> usize {
    match token {
        Token::Whitespace(Whitespace::Newline) => 1,
        Token::Whitespace(Whitespace::Space | Whitespace::Tab) => 0,
        other => other.to_string().matches('\n').count(),
    }
}
