//! Merge statistics and tracing hooks.
//!
//! Logging goes through `merge_event!`, which expands to nothing unless the
//! `tracing` feature is enabled.

use serde::{Deserialize, Serialize};

/// Counters kept by one merge. Cheap enough to always be on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Calls to `next()` that were not already terminal.
    pub pulls: u64,
    /// Results handed to the consumer.
    pub emitted: u64,
    /// Source polls, per source index.
    pub reads: Vec<u64>,
}

impl MergeStats {
    pub(crate) fn new(sources: usize) -> Self {
        Self {
            pulls: 0,
            emitted: 0,
            reads: vec![0; sources],
        }
    }

    pub fn total_reads(&self) -> u64 {
        self.reads.iter().sum()
    }
}

#[cfg(feature = "tracing")]
macro_rules! merge_event {
    ($level:ident, $($arg:tt)+) => {
        tracing::$level!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! merge_event {
    ($level:ident, $($arg:tt)+) => {{}};
}

pub(crate) use merge_event;
