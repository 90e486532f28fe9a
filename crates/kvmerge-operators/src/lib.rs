#![forbid(unsafe_code)]
//! kvmerge-operators: set-algebra over key-sorted sources.
//!
//! Design intent:
//! - Sources are lazy, single-pass `Stream`s already sorted by key. The engine
//!   never sorts, never deduplicates within a source and never buffers more
//!   than one element per source.
//! - One shared `Cursor` type plus one `SetOperator` strategy per operation
//!   (`Union`, `Intersect`, `Except`). Strategies are pure; the engine
//!   (`MergeStream`) owns all I/O, cancellation and limit accounting.
//! - Results are pulled one at a time with `MergeStream::next().await`.

pub mod builder;
pub mod cursor;
pub mod engine;
pub mod metrics;
pub mod ops;
pub mod traits;

pub use builder::{except, except_pair, intersect, intersect_pair, merge_by, union, MergeBuilder};
pub use cursor::Cursor;
pub use engine::{MergeState, MergeStream};
pub use metrics::MergeStats;
pub use ops::{Except, Intersect, OperatorKind, Union};
pub use traits::{Action, KeyFn, ResultFn, SetOperator, SourceStream};
