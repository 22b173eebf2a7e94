//! Error and Result types for Corsac CSV operations.

use crate::tokenize::TokenizeError;
use std::io;
use thiserror::Error;

/// A convenience `Result` type for Corsac operations.
pub type Result<T> = std::result::Result<T, CsvError>;

/// The error type for CSV parsing and loading operations.
///
/// Parsing errors carry the number of the offending line and its raw text,
/// so callers can report context without re-reading the input. In the
/// parallel loader line numbers are local to the failing partition.
#[derive(Debug, Error)]
pub enum CsvError {
    /// A quoted section was opened, closed, or escaped incorrectly.
    #[error("line {line}: {source} ({text:?})")]
    MalformedQuoting {
        /// Line number where the malformed quoting was detected (1-based).
        line: u64,
        /// Raw text of the offending line.
        text: String,
        /// The tokenizer-level cause, including the byte column.
        source: TokenizeError,
    },

    /// A line ended before every declared column was seen.
    #[error("line {line}: no field for column {column} ({text:?})")]
    MissingField {
        /// Line number of the short row (1-based).
        line: u64,
        /// Zero-based column for which no field was present.
        column: usize,
        /// Raw text of the offending line.
        text: String,
    },

    /// The declared header names differ from the file's first line.
    #[error("header mismatch at column {column}: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        /// Zero-based column at which the first mismatch occurred.
        column: usize,
        /// Header name that was declared by the caller.
        expected: String,
        /// Header name found in the file.
        found: String,
    },

    /// A field could not be converted to its declared column type.
    #[error("line {line}: column {column}: {source} ({text:?})")]
    ColumnConversion {
        /// Line number of the offending row (1-based).
        line: u64,
        /// Zero-based column whose conversion failed.
        column: usize,
        /// Raw text of the offending line.
        text: String,
        /// The conversion-level cause.
        source: ConvertError,
    },

    /// Underlying I/O error while opening or reading the input file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The caller supplied an unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A worker thread exited without reporting a result for its job.
    #[error("worker for job {job} exited without reporting a result")]
    WorkerLost {
        /// Index of the job whose result is missing.
        job: usize,
    },
}

/// Failure to convert a raw field to a typed value.
#[derive(Debug, Clone, Error)]
#[error("cannot convert {token:?} to {target}: {reason}")]
pub struct ConvertError {
    /// The raw field content, lossily decoded for display.
    pub token: String,
    /// Name of the target type.
    pub target: &'static str,
    /// Human-readable cause.
    pub reason: String,
}

impl ConvertError {
    /// Creates a conversion error for the given raw field and target type.
    pub fn new(token: impl Into<String>, target: &'static str, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            target,
            reason: reason.into(),
        }
    }
}
