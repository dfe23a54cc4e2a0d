//! Error types for record batching

use std::io;
use thiserror::Error;

/// Result type for record batching operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for record batching operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while persisting or loading metadata handles
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The iterator or source was configured in a way that cannot produce labels
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A classification label lies outside `[0, num_possible_labels)`
    #[error(
        "Invalid classification data: expected label value at column {column} to be in range \
         [0, {num_possible_labels}); got label value of {value}"
    )]
    InvalidLabel {
        /// The offending class index
        value: i64,
        /// Column of the record holding the label
        column: usize,
        /// Number of classes, the exclusive upper bound
        num_possible_labels: usize,
    },

    /// A single field could not be converted
    #[error("Field conversion error: {0}")]
    FieldConversion(String),

    /// A whole record could not be converted into an example
    #[error("Record conversion error: {0}")]
    RecordConversion(String),

    /// Index out of bounds
    #[error("Index out of bounds")]
    IndexOutOfBounds,

    /// A field was used in a way its type does not support
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Rows of a batch disagree on their width
    #[error("Shape mismatch in {matrix} matrix at row {row}: expected {expected} columns, got {actual}")]
    ShapeMismatch {
        /// Which matrix of the batch was being assembled
        matrix: &'static str,
        /// Width of the first row
        expected: usize,
        /// Width of the offending row
        actual: usize,
        /// Index of the offending row
        row: usize,
    },

    /// A metadata handle does not belong to the source asked to replay it
    #[error("Metadata mismatch: {0}")]
    MetadataMismatch(String),

    /// Binary serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source exhausted (no more records)
    #[error("Source exhausted")]
    SourceExhausted,
}

impl Error {
    /// Whether this error must abort a batch regardless of the skip policy
    /// applied to failed records.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfiguration(_) | Error::InvalidLabel { .. } | Error::ShapeMismatch { .. }
        )
    }
}
