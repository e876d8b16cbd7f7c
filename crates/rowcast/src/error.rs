//! Error types for the rowcast library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rowcast operations.
#[derive(Debug, Error)]
pub enum CasterError {
    /// A rule name that is neither a known setter nor a registered custom type.
    #[error("Call undefined method [{0}]!")]
    UndefinedMethod(String),

    /// A known rule was given an argument of the wrong shape.
    #[error("Invalid argument for '{rule}': {message}")]
    InvalidArgument { rule: String, message: String },

    /// A custom type that has not been registered.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A custom type name that collides with a built-in rule name.
    #[error("Type name '{0}' is reserved")]
    ReservedTypeName(String),

    /// Input that is neither a record nor a list of records.
    #[error("Expected a record or a list of records, got {0}")]
    NotARecord(String),

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a line of JSON Lines input.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no records to read.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for rowcast operations.
pub type Result<T> = std::result::Result<T, CasterError>;
