//! Convenient re-exports for downstream crates.

pub use crate::cancel::CancelContext;
pub use crate::config::MergeOptions;
pub use crate::error::{MergeError, Result};
pub use crate::kv::{KeyRange, KeySelector, KeySelectorPair, KeyValue};
pub use crate::order::{FnComparer, KeyComparer, NaturalOrder, Reversed, SharedComparer};
