//! Pattern scanner
//!
//! Converts a pattern string into a flat token stream terminated by `Eof`.
//! Escapes are resolved here: a backslash followed by a punctuator degrades
//! to a plain `Ascii` literal, a backslash followed by a recognized class
//! letter becomes the corresponding class or anchor token, and any other
//! backslash is emitted as a bare `Escape` token for the parser (which
//! reads backreferences out of it).

use crate::error::ScanError;
use crate::token::{Token, TokenKind, escape_kind, punctuation_kind};

/// Scanner over a pattern string
pub struct Scanner {
    chars: Vec<char>,
    current: usize,
    tokens: Vec<Token>,
}

impl Scanner {
    /// Create a scanner for the given pattern
    pub fn new(pattern: &str) -> Self {
        Scanner {
            chars: pattern.chars().collect(),
            current: 0,
            tokens: Vec::new(),
        }
    }

    /// Scan the whole pattern into tokens
    pub fn scan_tokens(mut self) -> Result<Vec<Token>, ScanError> {
        while !self.is_end() {
            self.scan_token()?;
        }
        self.tokens.push(Token::eof());
        Ok(self.tokens)
    }

    fn is_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn advance(&mut self) -> char {
        self.current += 1;
        self.chars[self.current - 1]
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn add_token(&mut self, kind: TokenKind, value: char) {
        self.tokens.push(Token::new(kind, value));
    }

    fn scan_token(&mut self) -> Result<(), ScanError> {
        let c = self.advance();
        let Some(kind) = punctuation_kind(c) else {
            return self.scan_literal(c);
        };
        if kind != TokenKind::Escape {
            self.add_token(kind, c);
            return Ok(());
        }
        match self.peek() {
            // trailing backslash stands for itself
            None => self.add_token(TokenKind::Ascii, c),
            Some(next) if punctuation_kind(next).is_some() => {
                self.advance();
                self.add_token(TokenKind::Ascii, next);
            }
            Some(next) => {
                if let Some(escape) = escape_kind(next) {
                    self.advance();
                    self.add_token(escape, next);
                } else {
                    self.add_token(TokenKind::Escape, c);
                }
            }
        }
        Ok(())
    }

    fn scan_literal(&mut self, c: char) -> Result<(), ScanError> {
        if !is_valid_char(c) {
            return Err(ScanError::UnsupportedCodePoint {
                character: c,
                position: self.current - 1,
            });
        }
        if c.is_ascii_digit() {
            self.add_token(TokenKind::Int, c);
        } else if c.is_ascii_alphabetic() {
            self.add_token(TokenKind::Letter, c);
        } else if c.is_ascii() {
            self.add_token(TokenKind::Ascii, c);
        } else {
            self.add_token(TokenKind::Char, c);
        }
        Ok(())
    }
}

/// Supported code points: tab, line feed, carriage return, and the
/// non-surrogate, non-noncharacter planes
fn is_valid_char(c: char) -> bool {
    let cp = c as u32;
    cp == 0x9
        || cp == 0xA
        || cp == 0xD
        || (0x20..=0xD7FF).contains(&cp)
        || (0xE000..=0xFFFD).contains(&cp)
        || (0x10000..=0x10FFFF).contains(&cp)
}
