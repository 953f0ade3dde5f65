//! Error types for the alignment pipeline.

use thiserror::Error;

/// Result type for alignment operations.
pub type AlignResult<T> = Result<T, AlignError>;

/// Errors that abort an alignment run.
///
/// Numerical degeneracy (singular systems, degenerate hulls, missing
/// observations) is handled in place and never surfaces here.
#[derive(Error, Debug)]
pub enum AlignError {
    /// A requested configuration cannot be carried out.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// Event records disagree on the number of frequency bands.
    #[error("inconsistent frequency band count: event '{event}' has {found} bands, expected {expected}")]
    InconsistentBandCount {
        event: String,
        expected: usize,
        found: usize,
    },

    /// The result set contains no event records.
    #[error("result set contains no events")]
    EmptyResultSet,

    /// A station required by the configuration has no known coordinates.
    #[error("no coordinates for station '{0}'")]
    UnknownStation(String),
}
