//! Uniform error surface for every registered function.
//!
//! Each error carries the function name plus one kind. Precedence when a
//! function checks its inputs: arity, then type, then domain, then parse.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("expected {expected} args, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("expected at least {min} args, got {got}")]
    ArityMin { min: usize, got: usize },

    #[error("expected {min} to {max} args, got {got}")]
    ArityRange { min: usize, max: usize, got: usize },

    #[error("argument {pos}: expected {expected}, got {got}")]
    Type {
        pos: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{0}")]
    Domain(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid path segment `{0}`")]
    Segment(String),

    #[error("unknown function")]
    UnknownFunction,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("`{function}`: {kind}")]
pub struct FnError {
    pub function: String,
    pub kind: ErrorKind,
}

impl FnError {
    pub fn new(function: impl Into<String>, kind: ErrorKind) -> Self {
        Self { function: function.into(), kind }
    }

    pub fn arity(function: &str, expected: usize, got: usize) -> Self {
        Self::new(function, ErrorKind::Arity { expected, got })
    }

    pub fn arity_min(function: &str, min: usize, got: usize) -> Self {
        Self::new(function, ErrorKind::ArityMin { min, got })
    }

    pub fn arity_range(function: &str, min: usize, max: usize, got: usize) -> Self {
        Self::new(function, ErrorKind::ArityRange { min, max, got })
    }

    pub fn type_error(function: &str, pos: usize, expected: &'static str, got: &'static str) -> Self {
        Self::new(function, ErrorKind::Type { pos, expected, got })
    }

    pub fn domain(function: &str, msg: impl Into<String>) -> Self {
        Self::new(function, ErrorKind::Domain(msg.into()))
    }

    pub fn parse(function: &str, msg: impl Into<String>) -> Self {
        Self::new(function, ErrorKind::Parse(msg.into()))
    }

    pub fn segment(function: &str, segment: impl Into<String>) -> Self {
        Self::new(function, ErrorKind::Segment(segment.into()))
    }

    pub fn unknown(function: &str) -> Self {
        Self::new(function, ErrorKind::UnknownFunction)
    }
}
