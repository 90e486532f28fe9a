#![forbid(unsafe_code)]
//! kvmerge-io: range-read collaborators.
//!
//! - `RangeReader` is the seam to a sorted store: one paginated read of a
//!   `[begin, end)` selector range.
//! - `RangeStream` turns a reader plus a selector pair into a lazy merge
//!   source that fetches the next page only when the previous one is drained.
//! - `MemoryStore` is a `BTreeMap`-backed reader for tests and demos.

pub mod memory_store;
pub mod range;
pub mod stream;

pub use memory_store::MemoryStore;
pub use range::{RangeChunk, RangeOptions, RangeReader};
pub use stream::RangeStream;
