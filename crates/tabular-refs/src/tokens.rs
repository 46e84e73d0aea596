//! Classifying tokenizer for formula text.
//!
//! Produces an ordered token stream for the reference resolver. Each token
//! carries the byte span of its full source text (quoting included) and a
//! classification; whitespace separates tokens but is not itself a token.
//!
//! The tokenizer is total: it never fails. An unterminated quote, bracket,
//! or string consumes to end of input and still yields its token, so
//! dependency scanning behaves on work-in-progress formulas.

/// Classification of a single token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `'quoted identifier'`: always names a table.
    TableName,
    /// Bare identifier: a table reference, or a function/variable name.
    TableOrBareName,
    /// `[bracketed identifier]`: names a column or a measure.
    ColumnOrMeasureName,
    /// Anything else: operators, punctuation, literals.
    Other,
}

/// One token of formula text.
///
/// `text` is the unescaped identifier content for name tokens (empty for
/// [`TokenKind::Other`]); `start..end` is the byte span of the token's full
/// source text including its delimiters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.bump();
        }
    }

    /// Consume up to (and including) a lone `delim`, unescaping doubled
    /// delimiters. Runs to end of input when the delimiter never closes.
    fn consume_delimited(&mut self, delim: char) -> String {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => break,
                Some(c) if c == delim => {
                    if self.peek() == Some(delim) {
                        self.bump();
                        out.push(delim);
                    } else {
                        break;
                    }
                }
                Some(c) => out.push(c),
            }
        }
        out
    }
}

fn is_ident_start(c: char) -> bool {
    // Identifiers are Unicode-aware: bare table names can contain non-ASCII
    // letters (e.g. `Straße`).
    c.is_alphabetic() || c == '_' || c == '.'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Tokenize `input` into an ordered, classified token stream.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut scanner = Scanner::new(input);
    let mut out = Vec::new();

    while let Some(c) = scanner.peek() {
        if c.is_whitespace() {
            scanner.eat_while(char::is_whitespace);
            continue;
        }

        let start = scanner.pos;
        match c {
            '\'' => {
                scanner.bump();
                let text = scanner.consume_delimited('\'');
                out.push(Token {
                    kind: TokenKind::TableName,
                    text,
                    start,
                    end: scanner.pos,
                });
            }
            '[' => {
                scanner.bump();
                let text = scanner.consume_delimited(']');
                out.push(Token {
                    kind: TokenKind::ColumnOrMeasureName,
                    text: text.trim().to_string(),
                    start,
                    end: scanner.pos,
                });
            }
            '"' => {
                // String literal: contents never produce name tokens.
                scanner.bump();
                let _ = scanner.consume_delimited('"');
                out.push(Token {
                    kind: TokenKind::Other,
                    text: String::new(),
                    start,
                    end: scanner.pos,
                });
            }
            c if c.is_ascii_digit() || c == '.' => {
                scanner.eat_while(|c| c.is_ascii_digit() || c == '.');
                // Exponent notation like `1e3` / `1E-3`.
                if matches!(scanner.peek(), Some('e' | 'E')) {
                    let saved = scanner.pos;
                    scanner.bump();
                    if matches!(scanner.peek(), Some('+' | '-')) {
                        scanner.bump();
                    }
                    if matches!(scanner.peek(), Some(c) if c.is_ascii_digit()) {
                        scanner.eat_while(|c| c.is_ascii_digit());
                    } else {
                        scanner.pos = saved;
                    }
                }
                out.push(Token {
                    kind: TokenKind::Other,
                    text: String::new(),
                    start,
                    end: scanner.pos,
                });
            }
            c if is_ident_start(c) => {
                scanner.eat_while(is_ident_part);
                out.push(Token {
                    kind: TokenKind::TableOrBareName,
                    text: input[start..scanner.pos].to_string(),
                    start,
                    end: scanner.pos,
                });
            }
            _ => {
                scanner.bump();
                out.push(Token {
                    kind: TokenKind::Other,
                    text: String::new(),
                    start,
                    end: scanner.pos,
                });
            }
        }
    }

    out
}
