use thiserror::Error;

pub mod account;
pub mod chunk;
pub mod shot;

/// Failure to decode one of the whitespace separated rows we persist.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected {expected} columns, got {got}")]
    Columns { expected: usize, got: usize },

    #[error("invalid number: {0:?}")]
    Number(String),

    #[error("expected {expected} rows, got {got}")]
    Rows { expected: usize, got: usize },
}
