//! Lexer for the Mica programming language
//!
//! Converts source text into a flat token vector ending in a single
//! `EndOfFile` token. The lexer accumulates diagnostics and keeps going, so
//! one bad character never hides the rest of the stream.
//!
//! ## Module structure
//!
//! - `tokens` - token types and the reserved-word tables

pub mod tokens;

pub use tokens::{Token, TokenKind, KEYWORDS, TYPE_KEYWORDS};

use crate::frontend::diagnostics::{Diagnostic, Diagnostics, Phase};

/// Lexer state: a byte cursor plus the 1-based line/column of that cursor.
///
/// The input is assumed ASCII; a stray non-ASCII character is consumed whole
/// and reported as unrecognized rather than splitting a UTF-8 sequence.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source, appending lexical diagnostics to `sink`.
    ///
    /// The returned vector always ends with exactly one `EndOfFile` token
    /// located just past the last byte.
    pub fn tokenize(mut self, sink: &mut Diagnostics) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(sink);
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    // ========================================================================
    // Core cursor handling
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.offset).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.as_bytes().get(self.offset + 1).copied()
    }

    /// Consume one byte. `\n` bumps the line and resets the column; every
    /// other byte advances the column.
    fn advance(&mut self) -> u8 {
        let byte = self.source.as_bytes()[self.offset];
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        byte
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.advance();
            } else if byte == b'/' && self.peek_next() == Some(b'/') {
                // Single-line comment runs up to (not including) the newline.
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    // ========================================================================
    // Scanning dispatch
    // ========================================================================

    fn next_token(&mut self, sink: &mut Diagnostics) -> Token<'a> {
        self.skip_trivia();

        if self.is_at_end() {
            return Token::new(TokenKind::EndOfFile, "", self.line, self.column);
        }

        let byte = self.peek().unwrap_or(0);

        if byte.is_ascii_alphabetic() || byte == b'_' {
            return self.scan_identifier();
        }
        if byte.is_ascii_digit() {
            return self.scan_number();
        }
        if byte == b'"' {
            return self.scan_string(sink);
        }
        if is_operator_byte(byte) {
            return self.scan_operator();
        }
        if is_punctuation_byte(byte) {
            return self.scan_punctuation();
        }

        self.scan_unknown(sink)
    }

    fn scan_identifier(&mut self) -> Token<'a> {
        let (line, column) = (self.line, self.column);
        let start = self.offset;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = &self.source[start..self.offset];
        let kind = if KEYWORDS.contains(lexeme) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, lexeme, line, column)
    }

    fn scan_number(&mut self) -> Token<'a> {
        let (line, column) = (self.line, self.column);
        let start = self.offset;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        // Fractional part; a trailing dot with no digits is still a number.
        if self.peek() == Some(b'.') {
            self.advance();
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.advance();
            }
        }
        Token::new(TokenKind::Number, &self.source[start..self.offset], line, column)
    }

    fn scan_string(&mut self, sink: &mut Diagnostics) -> Token<'a> {
        let (line, column) = (self.line, self.column);
        self.advance(); // opening quote
        let start = self.offset;

        while !self.is_at_end() && self.peek() != Some(b'"') {
            if self.peek() == Some(b'\\') {
                // Escapes pass through: the backslash and the next character
                // are consumed without interpretation.
                self.advance();
                if !self.is_at_end() {
                    self.advance();
                }
            } else {
                self.advance();
            }
        }

        if self.is_at_end() {
            sink.push(Diagnostic::error(
                Phase::Lexer,
                line,
                column,
                "Unterminated string literal",
            ));
            return Token::new(TokenKind::Unknown, &self.source[start..self.offset], line, column);
        }

        let lexeme = &self.source[start..self.offset];
        self.advance(); // closing quote
        Token::new(TokenKind::String, lexeme, line, column)
    }

    fn scan_operator(&mut self) -> Token<'a> {
        let (line, column) = (self.line, self.column);
        let start = self.offset;
        let first = self.advance();
        if let Some(next) = self.peek() {
            if is_two_char_operator(first, next) {
                self.advance();
            }
        }
        Token::new(TokenKind::Operator, &self.source[start..self.offset], line, column)
    }

    fn scan_punctuation(&mut self) -> Token<'a> {
        let (line, column) = (self.line, self.column);
        let start = self.offset;
        self.advance();
        Token::new(TokenKind::Punctuation, &self.source[start..self.offset], line, column)
    }

    fn scan_unknown(&mut self, sink: &mut Diagnostics) -> Token<'a> {
        let (line, column) = (self.line, self.column);
        let start = self.offset;
        // Consume a whole character so the slice stays on a UTF-8 boundary.
        let ch = self.source[self.offset..].chars().next().unwrap_or('\u{fffd}');
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
        sink.push(Diagnostic::error(
            Phase::Lexer,
            line,
            column,
            format!("Unrecognized character: '{ch}'"),
        ));
        Token::new(TokenKind::Unknown, &self.source[start..self.offset], line, column)
    }
}

fn is_operator_byte(byte: u8) -> bool {
    matches!(
        byte,
        b'+' | b'-' | b'*' | b'/' | b'=' | b'!' | b'<' | b'>' | b'&' | b'|' | b'^' | b'%'
    )
}

fn is_punctuation_byte(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'{' | b'}' | b'[' | b']' | b',' | b':' | b';' | b'.'
    )
}

fn is_two_char_operator(first: u8, next: u8) -> bool {
    matches!(
        (first, next),
        (b'=', b'=')
            | (b'!', b'=')
            | (b'<', b'=')
            | (b'>', b'=')
            | (b'&', b'&')
            | (b'|', b'|')
            | (b'<', b'<')
            | (b'>', b'>')
    )
}

/// Convenience function to lex a source string into `sink`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex<'a>(source: &'a str, sink: &mut Diagnostics) -> Vec<Token<'a>> {
    Lexer::new(source).tokenize(sink)
}

// ============================================================================
// TESTS
// ============================================================================
