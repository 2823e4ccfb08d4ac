//! Restricted arithmetic expressions over named symbols.
//!
//! DH table cells are linear combinations of named link lengths and joint
//! variables, e.g. `L1+L2*2` or `q3-90`. This module provides the two stages
//! of turning such a cell into a number:
//!
//! - [`resolve`] substitutes every bound identifier with its value and returns
//!   the normalized expression text (used for diagnostics).
//! - [`evaluate`] computes a fully-substituted expression. Only numeric
//!   literals, `+ - * /`, unary sign, and parentheses are accepted; an identifier
//!   that survives resolution is an [`ExpressionError::UnresolvedSymbol`].
//!
//! Substitution happens on tokens, never on raw text, so binding `q1` cannot
//! alter an occurrence of `q12`.

use crate::error::ExpressionError;
use crate::symbols::{SymbolScope, format_literal};
use std::fmt;

/// Maximum parenthesis nesting accepted by the evaluator.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => f.write_str(&format_literal(*v)),
            Token::Ident(name) => f.write_str(name),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    position: usize,
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    src: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            input: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, ExpressionError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
                continue;
            }

            let position = self.pos;
            let token = if ch.is_ascii_digit() || ch == b'.' {
                self.scan_number()?
            } else if ch == b'_' || ch.is_ascii_alphabetic() {
                self.scan_identifier()
            } else {
                self.pos += 1;
                match ch {
                    b'+' => Token::Plus,
                    b'-' => Token::Minus,
                    b'*' => Token::Star,
                    b'/' => Token::Slash,
                    b'(' => Token::LParen,
                    b')' => Token::RParen,
                    _ => {
                        let ch = self.src[position..].chars().next().unwrap_or('?');
                        return Err(ExpressionError::UnexpectedCharacter { ch, position });
                    }
                }
            };
            tokens.push(Spanned { token, position });
        }
        Ok(tokens)
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn scan_number(&mut self) -> Result<Token, ExpressionError> {
        let start = self.pos;
        self.consume_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            self.consume_digits();
        }

        // Exponent only when digits follow, so `2e` lexes as `2` then identifier `e`.
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digits_at = match self.peek_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if self.peek_at(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += digits_at;
                self.consume_digits();
            }
        }

        let literal = &self.src[start..self.pos];
        match literal.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Token::Number(value)),
            _ => Err(ExpressionError::InvalidNumber {
                literal: literal.to_string(),
                position: start,
            }),
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c == b'_' || c.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

struct Evaluator<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    scopes: &'a [&'a SymbolScope],
}

impl<'a> Evaluator<'a> {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn unexpected(&self) -> ExpressionError {
        match self.tokens.get(self.pos) {
            Some(s) => ExpressionError::UnexpectedToken {
                found: s.token.to_string(),
                position: s.position,
            },
            None => ExpressionError::UnexpectedEnd,
        }
    }

    fn run(mut self) -> Result<f64, ExpressionError> {
        if self.tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }
        let value = self.parse_expression()?;
        if self.pos < self.tokens.len() {
            return Err(self.unexpected());
        }
        Ok(value)
    }

    fn parse_expression(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.parse_term()?;
        loop {
            match self.current() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = finite(value + self.parse_term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = finite(value - self.parse_term()?)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.parse_unary()?;
        loop {
            match self.current() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = finite(value * self.parse_unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.parse_unary()?;
                    if divisor == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    value = finite(value / divisor)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_unary(&mut self) -> Result<f64, ExpressionError> {
        match self.current() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(|ev| ev.parse_unary())
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.nested(|ev| ev.parse_unary()).map(|v| -v)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<f64, ExpressionError> {
        match self.current().cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                self.scopes
                    .iter()
                    .find_map(|scope| scope.lookup(&name))
                    .ok_or(ExpressionError::UnresolvedSymbol { name })
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let value = self.nested(|ev| ev.parse_expression())?;
                match self.current() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err(self.unexpected()),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<f64, ExpressionError>,
    ) -> Result<f64, ExpressionError> {
        if self.depth >= MAX_NESTING {
            return Err(ExpressionError::NestingTooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Every intermediate result must stay finite.
fn finite(value: f64) -> Result<f64, ExpressionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExpressionError::NonFinite)
    }
}

/// True when `name` lexes as a single identifier token.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Substitutes bound identifiers in `expr` with their values.
///
/// `scopes` are consulted in order and the first binding wins, so tables with
/// joint variables are normally passed before the length table. Identifiers
/// that no scope binds are kept verbatim; [`evaluate`] reports them.
///
/// The result is the token stream re-rendered with single spaces, e.g.
/// `resolve("L1*2", &[&lengths])` gives `"0.5 * 2"`.
pub fn resolve(expr: &str, scopes: &[&SymbolScope]) -> Result<String, ExpressionError> {
    let tokens = Lexer::new(expr).tokenize()?;
    let parts: Vec<String> = tokens
        .into_iter()
        .map(|spanned| match spanned.token {
            Token::Ident(name) => scopes
                .iter()
                .find_map(|scope| scope.replacement(&name))
                .unwrap_or(name),
            other => other.to_string(),
        })
        .collect();
    Ok(parts.join(" "))
}

/// Evaluates a fully-substituted arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, ExpressionError> {
    evaluate_with(expr, &[])
}

/// Evaluates `expr`, reading identifiers straight from `scopes` (first binding wins).
pub fn evaluate_with(expr: &str, scopes: &[&SymbolScope]) -> Result<f64, ExpressionError> {
    let tokens = Lexer::new(expr).tokenize()?;
    Evaluator {
        tokens,
        pos: 0,
        depth: 0,
        scopes,
    }
    .run()
}
