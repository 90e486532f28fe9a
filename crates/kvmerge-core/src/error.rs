use thiserror::Error;

/// Canonical result for every kvmerge crate.
pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Rejected before any I/O: wrong number of sources, reverse ranges, ...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A source failed to produce its next element. Terminal for the merge.
    #[error("Source failure: {0}")]
    Source(String),

    // Only raised when `MergeOptions::verify_order` is on; otherwise an
    // unsorted source silently produces wrong output.
    #[error("Source {source_index} is not sorted: {detail}")]
    OrderingViolation { source_index: usize, detail: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl MergeError {
    pub fn source_failure(msg: impl Into<String>) -> Self {
        MergeError::Source(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        MergeError::InvalidArgument(msg.into())
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(e: serde_json::Error) -> Self {
        MergeError::Config(e.to_string())
    }
}
