#![forbid(unsafe_code)]
//! kvmerge: union, intersect and except over key-sorted, lazily fetched
//! sources.
//!
//! - `kvmerge::{error, config, order, kv, cancel}`: the shared vocabulary.
//! - `kvmerge::operators`: cursors, the merge engine and the three operators
//!   over any `Stream<Item = Result<E>>`.
//! - `kvmerge::io`: paginated range sources and the in-memory store.
//! - `kvmerge::exec`: range-level queries built from the above.
//!
//! The most common items are re-exported at the root.

pub use kvmerge_core::{cancel, config, error, kv, order};
pub use kvmerge_exec as exec;
pub use kvmerge_io as io;
pub use kvmerge_operators as operators;

pub use kvmerge_core::prelude::*;
pub use kvmerge_operators::{
    except, except_pair, intersect, intersect_pair, merge_by, union, Action, MergeBuilder,
    MergeState, MergeStats, MergeStream, OperatorKind, SetOperator, SourceStream,
};
