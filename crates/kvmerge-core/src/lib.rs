#![forbid(unsafe_code)]
//! kvmerge-core: the shared vocabulary of the merge operators.
//!
//! - `error`: one error enum for every crate in the workspace.
//! - `config`: `MergeOptions`, serializable and loadable from the environment.
//! - `order`: the `KeyComparer` ordering contract.
//! - `kv`: key/value pairs, key selectors and key ranges.
//! - `cancel`: the explicit cancellation context.
//!
//! No I/O lives here.

pub mod cancel;
pub mod config;
pub mod error;
pub mod kv;
pub mod order;
pub mod prelude;

pub use error::{MergeError, Result};
