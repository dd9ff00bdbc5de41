//! Error taxonomy shared by every analysis stage.

use thiserror::Error;

use crate::grammar::{ConflictReport, Lookahead, Symbol};
use serde::Serialize;

/// A grammar that violates one of the structural invariants, either while
/// reading its text form or while assembling it from parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("no production rules found")]
    Empty,

    #[error("start symbol {0} is not a declared non-terminal")]
    UndeclaredStart(String),

    #[error("{0} is declared both as a terminal and as a non-terminal")]
    AmbiguousSymbol(String),

    #[error("{0} is reserved and cannot be declared as a symbol")]
    ReservedName(String),

    #[error("production head {0} is not a declared non-terminal")]
    UndeclaredHead(String),

    #[error("symbol {symbol} in production {production} is not declared")]
    UndeclaredSymbol { symbol: String, production: String },

    #[error("end-of-input marker used in the body of {0}")]
    EndMarkerInBody(String),

    #[error("non-terminal {0} has no productions")]
    NoProductions(String),
}

/// Why the parsing automaton rejected an input. `step` is the index of the
/// trace entry holding the error, `position` the index of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ParseError {
    #[error("step {step}: expected {expected} but found {found} at position {position}")]
    UnexpectedToken {
        step: usize,
        position: usize,
        expected: Symbol,
        found: Lookahead,
    },

    #[error("step {step}: no production for ({non_terminal}, {lookahead}) at position {position}")]
    NoProduction {
        step: usize,
        position: usize,
        non_terminal: String,
        lookahead: Lookahead,
    },
}

impl ParseError {
    pub fn step(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { step, .. } | ParseError::NoProduction { step, .. } => {
                *step
            }
        }
    }

    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::NoProduction { position, .. } => *position,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed grammar: {0}")]
    MalformedGrammar(#[from] GrammarError),

    #[error(transparent)]
    GrammarNotLL1(#[from] ConflictReport),

    #[error("input rejected: {0}")]
    Parse(#[from] ParseError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
