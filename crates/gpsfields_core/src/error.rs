// error.rs: error types for extraction, reading lines and configuration
use thiserror::Error;

use crate::extractor::MAX_BUFFER_CAPACITY;

/// Failure of a pointer-level extraction call. Truncated or malformed input
/// is not an error; it shows up as a lower field count.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("null input or output buffer")]
    NullArgument,
}

impl ExtractError {
    /// Integer code returned across the C boundary. Never in `0..=4`.
    pub const fn code(self) -> i32 {
        match self {
            ExtractError::NullArgument => -1,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("empty record")]
    EmptyRecord,
    #[error("expected at least {required} fields, found {found}")]
    MissingCoordinates { found: usize, required: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("delimiter must be a single non-NUL ASCII byte, got {0:?}")]
    InvalidDelimiter(String),
    #[error("buffer_capacity must be between 1 and {max}, got {0}", max = MAX_BUFFER_CAPACITY)]
    InvalidCapacity(usize),
}
