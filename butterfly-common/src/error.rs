//! Error types for the butterfly-osm toolkit
//!
//! Library crates return [`Error`] so that callers can tell rejected input
//! (skip and count) apart from I/O and corrupted state (abort the batch).

use thiserror::Error;

/// Main error type for butterfly-osm operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A way class code outside the 16 known classes
    #[error("Way class must be between 0 and 15, but was: {0}")]
    ClassOutOfRange(u32),

    /// A track part that map matching never assigned a way class
    #[error("Track part has no way class assigned")]
    Unclassified,

    /// Parallel arrays whose lengths do not line up
    #[error("Length mismatch: expected {expected} {what}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An operation that needs at least one sample received none
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Accumulator update carrying no distance
    #[error("Cannot update a rider entry with zero distance")]
    ZeroDistance,

    /// Curve fitting could not produce finite parameters
    #[error("Curve fitting failed: {0}")]
    FitFailed(String),

    /// Persisted profile failed validation
    #[error("Corrupt profile '{name}': {reason}")]
    CorruptProfile { name: String, reason: String },

    /// Configuration file could not be parsed or holds invalid values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encoding or decoding of persisted state failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Input errors are recoverable within a batch: the sample is skipped.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::ClassOutOfRange(_)
                | Error::Unclassified
                | Error::LengthMismatch { .. }
                | Error::EmptyInput(_)
                | Error::ZeroDistance
        )
    }
}

/// Convenience result type for butterfly-osm operations
pub type Result<T> = std::result::Result<T, Error>;
