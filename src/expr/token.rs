//! Expression tokenizer.
//!
//! One forward pass over the source recognizing four token shapes: decimal
//! integer literals, brackets, operators (`<<` `>>` `>>>` and the
//! single-character set `+ - * / % & | ^ ~`), and greedy identifier runs
//! (any other non-space characters, stopping at whitespace, brackets, and
//! single-character operators). Identifier junk is not rejected here; it
//! fails field resolution in the compiler, which is where an unmatched
//! substring becomes a fatal compile error.

use crate::expr::error::{ExprError, ExprErrorKind};

/// Operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpToken {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    ShrU,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Decimal integer literal.
    Integer(i32),
    /// Field or external-value reference (resolution happens later).
    Identifier(String),
    /// Operator.
    Operator(OpToken),
    /// `(`
    LParen,
    /// `)`
    RParen,
}

/// One token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token payload.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

struct Scanner<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }

    /// True for characters that terminate an identifier run.
    fn is_boundary(ch: u8) -> bool {
        ch.is_ascii_whitespace()
            || matches!(
                ch,
                b'(' | b')' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'~'
            )
    }

    fn scan_integer(&mut self) -> Result<Token, ExprError> {
        let start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        // A digit run flowing straight into identifier characters is a
        // malformed literal, not two tokens.
        if let Some(next) = self.peek() {
            if !Self::is_boundary(next) && !matches!(next, b'<' | b'>') {
                return Err(ExprError::compile(
                    ExprErrorKind::MalformedLiteral,
                    start,
                    "numeric literal runs into identifier characters",
                    self.source,
                ));
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .expect("digits are valid UTF-8");
        let value: i32 = text.parse().map_err(|_| {
            ExprError::compile(
                ExprErrorKind::MalformedLiteral,
                start,
                format!("integer literal '{text}' overflows 32 bits"),
                self.source,
            )
        })?;
        Ok(Token {
            kind: TokenKind::Integer(value),
            offset: start,
        })
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self.pos < self.input.len() && !Self::is_boundary(self.input[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .expect("identifier bytes come from a str")
            .to_string();
        Token {
            kind: TokenKind::Identifier(text),
            offset: start,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ExprError> {
        self.skip_whitespace();
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let start = self.pos;

        if ch.is_ascii_digit() {
            return self.scan_integer().map(Some);
        }

        let op = match ch {
            b'(' => {
                self.pos += 1;
                return Ok(Some(Token {
                    kind: TokenKind::LParen,
                    offset: start,
                }));
            }
            b')' => {
                self.pos += 1;
                return Ok(Some(Token {
                    kind: TokenKind::RParen,
                    offset: start,
                }));
            }
            b'+' => Some(OpToken::Plus),
            b'-' => Some(OpToken::Minus),
            b'*' => Some(OpToken::Star),
            b'/' => Some(OpToken::Slash),
            b'%' => Some(OpToken::Percent),
            b'&' => Some(OpToken::Amp),
            b'|' => Some(OpToken::Pipe),
            b'^' => Some(OpToken::Caret),
            b'~' => Some(OpToken::Tilde),
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                return Ok(Some(Token {
                    kind: TokenKind::Operator(OpToken::Shl),
                    offset: start,
                }));
            }
            b'>' if self.peek_at(1) == Some(b'>') => {
                let (op, len) = if self.peek_at(2) == Some(b'>') {
                    (OpToken::ShrU, 3)
                } else {
                    (OpToken::Shr, 2)
                };
                self.pos += len;
                return Ok(Some(Token {
                    kind: TokenKind::Operator(op),
                    offset: start,
                }));
            }
            _ => None,
        };

        if let Some(op) = op {
            self.pos += 1;
            return Ok(Some(Token {
                kind: TokenKind::Operator(op),
                offset: start,
            }));
        }

        // Everything else (including `$`, dotted paths, and stray `<`/`>`)
        // starts a greedy identifier run.
        Ok(Some(self.scan_identifier()))
    }
}

/// Tokenizes an expression source string.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = scanner.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}
