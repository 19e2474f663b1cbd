//! Error type shared by the formula modules.
//!
//! The formulas themselves are total over well-formed input (NaN and `-inf`
//! propagate unguarded). Errors only describe structural misuse: arrays
//! that must line up but don't, or an index past the end of a row.

use thiserror::Error;

/// Result alias for fallible formula calls.
pub type Result<T> = std::result::Result<T, RlhfError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RlhfError {
    /// Two arrays that must be aligned have different lengths.
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An index points past the end of a row.
    #[error("index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A non-empty input was required.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A parameter outside the domain the formula accepts.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
}

impl RlhfError {
    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(RlhfError::LengthMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}
