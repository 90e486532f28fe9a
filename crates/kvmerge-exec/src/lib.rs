#![forbid(unsafe_code)]
//! kvmerge-exec: range-level merge queries.
//!
//! Opens paginated range sources against a `RangeReader` and runs the
//! operators of `kvmerge-operators` over them: `merge_sort`, `intersect`,
//! `except` over selector pairs and `except_ranges` over plain key ranges.

pub mod metrics;
pub mod query;

pub use query::{except, except_ranges, intersect, merge_sort, range_merge, RangeMerge};
