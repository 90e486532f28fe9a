//! Operator trait + common interfaces.
//!
//! The merge engine owns the cursors and does all I/O. Operators only look at
//! the cursors' current keys and answer with an `Action`, which keeps every
//! operator testable without a single source.

use std::sync::Arc;

use futures::stream::BoxStream;
use kvmerge_core::order::KeyComparer;
use kvmerge_core::Result;

/// A lazy, finite, single-pass sequence of elements sorted by key.
///
/// Any `Stream<Item = Result<E>> + Send + Unpin` qualifies; this is the boxed
/// form used when sources of different concrete types are merged together.
pub type SourceStream<E> = BoxStream<'static, Result<E>>;

/// Extracts the comparison key of an element.
pub type KeyFn<E, K> = Arc<dyn Fn(&E) -> K + Send + Sync>;

/// Projects an emitted element into the caller's result type.
pub type ResultFn<E, R> = Box<dyn FnMut(E) -> R + Send>;

/// What the engine should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Hand the element of cursor `from` to the consumer. The cursors listed
    /// in `advance` move forward on the following pull, never before.
    Emit { from: usize, advance: Vec<usize> },

    /// Move these cursors forward now, then ask again.
    Advance(Vec<usize>),

    /// No further result is possible.
    Done,
}

impl Action {
    pub fn emit_and_advance(from: usize) -> Self {
        Action::Emit {
            from,
            advance: vec![from],
        }
    }
}

/// Strategy deciding how the cursors of a merge move.
///
/// `heads[i]` is the current key of cursor `i`, or `None` once it is
/// exhausted. Implementations must only ask to advance cursors that still
/// hold a key, and must make progress: every `Advance` moves at least one
/// cursor, so a merge terminates within the sum of the source lengths.
pub trait SetOperator<K>: Send {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Fewest sources this operator accepts.
    fn min_sources(&self) -> usize {
        1
    }

    fn select_next(&self, heads: &[Option<&K>], cmp: &dyn KeyComparer<K>) -> Action;
}
