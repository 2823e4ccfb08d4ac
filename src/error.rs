//! Error types for table loading, expression evaluation, and chain construction.

use std::num::ParseFloatError;
use thiserror::Error;

/// Errors raised while tokenizing, resolving, or evaluating an arithmetic expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// The expression contained no tokens.
    #[error("empty expression")]
    Empty,

    /// A character outside the arithmetic grammar.
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    /// A numeric literal that does not parse as a finite `f64`.
    #[error("invalid number '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },

    /// A token that cannot appear where it was found.
    #[error("unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    /// The input ended in the middle of an expression.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// An identifier with no binding reached the evaluator.
    #[error("unresolved symbol '{name}'")]
    UnresolvedSymbol { name: String },

    #[error("division by zero")]
    DivisionByZero,

    /// Arithmetic overflowed to infinity or produced NaN.
    #[error("result is not a finite number")]
    NonFinite,

    #[error("parentheses nested deeper than {limit}")]
    NestingTooDeep { limit: usize },
}

/// Errors that abort a conversion run.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A numeric table cell that is not a valid number.
    #[error("{table} table, line {line}: cannot parse '{value}' as a number")]
    Parse {
        table: &'static str,
        line: u64,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// A length table entry with an unusable name or value.
    #[error("{table} table, line {line}: invalid entry '{value}': {reason}")]
    InvalidEntry {
        table: &'static str,
        line: u64,
        value: String,
        reason: &'static str,
    },

    /// A row with fewer columns than the table requires.
    #[error("{table} table, line {line}: missing column '{column}'")]
    MissingField {
        table: &'static str,
        line: u64,
        column: &'static str,
    },

    /// A DH cell that failed to resolve or evaluate.
    #[error("segment '{segment}': cannot evaluate {parameter} expression '{expression}'")]
    Evaluation {
        segment: String,
        parameter: &'static str,
        expression: String,
        #[source]
        source: ExpressionError,
    },

    /// The symbol interner refused a name.
    #[error("cannot intern symbol '{0}'")]
    Symbol(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The chain cannot be expressed in the requested output format.
    #[error("cannot export chain: {0}")]
    Export(String),
}

impl ChainError {
    /// Creates an evaluation error for one DH parameter of a segment.
    #[must_use]
    pub fn evaluation(
        segment: impl Into<String>,
        parameter: &'static str,
        expression: impl Into<String>,
        source: ExpressionError,
    ) -> Self {
        Self::Evaluation {
            segment: segment.into(),
            parameter,
            expression: expression.into(),
            source,
        }
    }
}

pub type Result<T, E = ChainError> = std::result::Result<T, E>;
