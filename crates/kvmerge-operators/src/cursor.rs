//! Per-source cursor: the current element of one source plus its key.

use futures::{Stream, StreamExt};

use kvmerge_core::error::{MergeError, Result};
use kvmerge_core::order::KeyComparer;

use crate::traits::KeyFn;

/// Wraps one source. Never reads more than one element ahead.
///
/// The key of the last element read stays around after the element itself
/// has been handed out, so that monotonicity can be checked on the next read.
///
/// `due` marks a cursor whose current element is used up (or that was never
/// read). It is cleared only when the cursor's own advance completes, so an
/// advance dropped half-way is simply retried by the next one.
pub struct Cursor<S, E, K> {
    index: usize,
    source: Option<S>,
    key: Option<K>,
    item: Option<E>,
    exhausted: bool,
    due: bool,
    reads: u64,
}

impl<S, E, K> Cursor<S, E, K>
where
    S: Stream<Item = Result<E>> + Send + Unpin,
{
    pub fn new(index: usize, source: S) -> Self {
        Self {
            index,
            source: Some(source),
            key: None,
            item: None,
            exhausted: false,
            due: true,
            reads: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Key of the current element; `None` before the first advance and once exhausted.
    pub fn key(&self) -> Option<&K> {
        if self.exhausted {
            None
        } else {
            self.key.as_ref()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of times the underlying source was polled for an element.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Whether the cursor must advance before its head can be looked at.
    pub fn is_due(&self) -> bool {
        self.due && !self.exhausted
    }

    /// Mark the current element as used up.
    pub fn mark_due(&mut self) {
        self.due = true;
    }

    /// Move the current element out and mark the cursor due. The key stays
    /// until the next advance.
    pub fn take_item(&mut self) -> Option<E> {
        self.due = true;
        self.item.take()
    }

    /// Read the next element. Returns `false` once the source is exhausted;
    /// calling it again after that does not touch the source.
    pub async fn advance(
        &mut self,
        key_of: &KeyFn<E, K>,
        cmp: &dyn KeyComparer<K>,
        verify_order: bool,
    ) -> Result<bool> {
        if self.exhausted {
            self.due = false;
            return Ok(false);
        }
        let Some(source) = self.source.as_mut() else {
            self.release();
            return Ok(false);
        };

        self.reads += 1;
        match source.next().await {
            Some(Ok(item)) => {
                let key = key_of(&item);
                if verify_order {
                    if let Some(previous) = self.key.as_ref() {
                        if cmp.violates_monotonicity(previous, &key) {
                            return Err(MergeError::OrderingViolation {
                                source_index: self.index,
                                detail: format!(
                                    "read #{} sorts before the previous key ({} order)",
                                    self.reads,
                                    cmp.label()
                                ),
                            });
                        }
                    }
                }
                self.key = Some(key);
                self.item = Some(item);
                self.due = false;
                Ok(true)
            }
            Some(Err(e)) => Err(e),
            None => {
                self.release();
                Ok(false)
            }
        }
    }

    /// Drop the source and any pending element. The cursor reports exhaustion
    /// from then on.
    pub fn release(&mut self) {
        self.exhausted = true;
        self.due = false;
        self.source = None;
        self.key = None;
        self.item = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::stream;
    use kvmerge_core::order::NaturalOrder;

    use super::*;

    fn key_of() -> KeyFn<(u32, &'static str), u32> {
        Arc::new(|e: &(u32, &'static str)| e.0)
    }

    #[tokio::test]
    async fn test_advance_until_exhausted_is_idempotent() {
        let src = stream::iter(vec![Ok::<_, MergeError>((1u32, "a")), Ok((2, "b"))]);
        let mut cursor = Cursor::new(0, src);
        let key_of = key_of();

        assert!(cursor.key().is_none());
        assert!(cursor.advance(&key_of, &NaturalOrder, true).await.unwrap());
        assert_eq!(cursor.key(), Some(&1));
        assert_eq!(cursor.take_item(), Some((1, "a")));
        assert_eq!(cursor.key(), Some(&1));

        assert!(cursor.advance(&key_of, &NaturalOrder, true).await.unwrap());
        assert!(!cursor.advance(&key_of, &NaturalOrder, true).await.unwrap());
        assert!(cursor.is_exhausted());
        assert!(cursor.key().is_none());

        assert!(!cursor.advance(&key_of, &NaturalOrder, true).await.unwrap());
        assert_eq!(cursor.reads(), 3);
    }

    #[tokio::test]
    async fn test_due_until_own_advance_completes() {
        let src = stream::iter(vec![Ok::<_, MergeError>((1u32, "a")), Ok((2, "b"))]);
        let mut cursor = Cursor::new(0, src);
        let key_of = key_of();
        assert!(cursor.is_due());

        cursor.advance(&key_of, &NaturalOrder, true).await.unwrap();
        assert!(!cursor.is_due());

        cursor.take_item();
        assert!(cursor.is_due());
        cursor.advance(&key_of, &NaturalOrder, true).await.unwrap();
        assert!(!cursor.is_due());

        cursor.mark_due();
        assert!(!cursor.advance(&key_of, &NaturalOrder, true).await.unwrap());
        assert!(!cursor.is_due());
    }

    #[tokio::test]
    async fn test_out_of_order_detected_when_verifying() {
        let src = stream::iter(vec![Ok::<_, MergeError>((5u32, "a")), Ok((3, "b"))]);
        let mut cursor = Cursor::new(2, src);
        let key_of = key_of();

        cursor.advance(&key_of, &NaturalOrder, true).await.unwrap();
        let err = cursor.advance(&key_of, &NaturalOrder, true).await.unwrap_err();
        assert!(matches!(err, MergeError::OrderingViolation { source_index: 2, .. }));
    }

    #[tokio::test]
    async fn test_out_of_order_passes_without_verification() {
        let src = stream::iter(vec![Ok::<_, MergeError>((5u32, "a")), Ok((3, "b"))]);
        let mut cursor = Cursor::new(0, src);
        let key_of = key_of();

        cursor.advance(&key_of, &NaturalOrder, false).await.unwrap();
        assert!(cursor.advance(&key_of, &NaturalOrder, false).await.unwrap());
        assert_eq!(cursor.key(), Some(&3));
    }
}
