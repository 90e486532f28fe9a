//! In-memory sorted store for tests and demos.
//!
//! A `BTreeMap` behind a lock, serving paginated range reads. Counts every
//! read and can be told to start failing after a number of reads, so callers
//! can observe laziness and fault handling.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};

use kvmerge_core::error::{MergeError, Result};
use kvmerge_core::kv::{KeySelector, KeyValue};

use crate::range::{RangeChunk, RangeOptions, RangeReader};

/// Thread-safe in-memory store. Clones share the same data and counters.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
    reads: Arc<AtomicUsize>,
    fail_after: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            reads: Arc::new(AtomicUsize::new(0)),
            fail_after: Arc::new(AtomicUsize::new(usize::MAX)),
        }
    }

    pub fn insert(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &[u8]) -> Option<Bytes> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.clear();
    }

    /// Number of `get_range` calls served so far, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Serve `n` more reads, then fail every read after that.
    pub fn fail_after(&self, n: usize) {
        let at = self.reads().saturating_add(n);
        self.fail_after.store(at, Ordering::SeqCst);
    }

    /// Read one page synchronously. `get_range` wraps this.
    pub fn read_page(
        &self,
        begin: &KeySelector,
        end: &KeySelector,
        options: &RangeOptions,
    ) -> Result<RangeChunk> {
        let served = self.reads.fetch_add(1, Ordering::SeqCst);
        if served >= self.fail_after.load(Ordering::SeqCst) {
            return Err(MergeError::source_failure(format!(
                "memory store: injected failure on read #{}",
                served + 1
            )));
        }

        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let from = resolve(&data, begin);
        let to = resolve(&data, end);
        if to <= from {
            return Ok(RangeChunk::default());
        }

        let take = options.page_limit();
        let items: Vec<KeyValue> = data
            .iter()
            .skip(from)
            .take(take.min(to - from))
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
            .collect();
        let has_more = from + items.len() < to;
        Ok(RangeChunk { items, has_more })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeReader for MemoryStore {
    fn get_range<'a>(
        &'a self,
        begin: &'a KeySelector,
        end: &'a KeySelector,
        options: &'a RangeOptions,
        _iteration: u32,
    ) -> BoxFuture<'a, Result<RangeChunk>> {
        future::ready(self.read_page(begin, end, options)).boxed()
    }
}

/// Position of `selector` among the sorted keys, clamped to `[0, len]`.
fn resolve(data: &BTreeMap<Bytes, Bytes>, selector: &KeySelector) -> usize {
    let key = selector.key.as_ref();
    let below = if selector.or_equal {
        data.range::<[u8], _>((Bound::Unbounded, Bound::Included(key))).count()
    } else {
        data.range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key))).count()
    };
    let pos = below as i64 - 1 + i64::from(selector.offset);
    pos.clamp(0, data.len() as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for k in [b"a", b"c", b"e", b"g"] {
            store.insert(Bytes::from_static(k), Bytes::from_static(b"v"));
        }
        store
    }

    fn keys(chunk: &RangeChunk) -> Vec<&[u8]> {
        chunk.items.iter().map(|kv| kv.key.as_ref()).collect()
    }

    #[test]
    fn test_memory_store_selector_resolution() {
        let store = store();
        let all = RangeOptions::default();

        let chunk = store
            .read_page(
                &KeySelector::first_greater_or_equal(Bytes::from_static(b"c")),
                &KeySelector::first_greater_or_equal(Bytes::from_static(b"g")),
                &all,
            )
            .unwrap();
        assert_eq!(keys(&chunk), vec![b"c".as_ref(), b"e".as_ref()]);
        assert!(!chunk.has_more);

        let chunk = store
            .read_page(
                &KeySelector::first_greater_than(Bytes::from_static(b"c")),
                &KeySelector::first_greater_than(Bytes::from_static(b"g")),
                &all,
            )
            .unwrap();
        assert_eq!(keys(&chunk), vec![b"e".as_ref(), b"g".as_ref()]);

        let chunk = store
            .read_page(
                &KeySelector::last_less_than(Bytes::from_static(b"c")),
                &KeySelector::first_greater_or_equal(Bytes::from_static(b"d")),
                &all,
            )
            .unwrap();
        assert_eq!(keys(&chunk), vec![b"a".as_ref(), b"c".as_ref()]);
    }

    #[test]
    fn test_memory_store_inclusive_and_shifted_selectors() {
        let store = store();
        let all = RangeOptions::default();

        // lLE(c) resolves onto "c" itself, lLE(c) + 1 onto "e".
        let chunk = store
            .read_page(
                &KeySelector::last_less_or_equal(Bytes::from_static(b"c")),
                &(KeySelector::last_less_or_equal(Bytes::from_static(b"c")) + 2),
                &all,
            )
            .unwrap();
        assert_eq!(keys(&chunk), vec![b"c".as_ref(), b"e".as_ref()]);

        // Selectors past either end clamp to the key space.
        let chunk = store
            .read_page(
                &(KeySelector::first_greater_or_equal(Bytes::from_static(b"a")) + -5),
                &(KeySelector::first_greater_than(Bytes::from_static(b"z")) + 5),
                &all,
            )
            .unwrap();
        assert_eq!(chunk.items.len(), 4);
    }

    #[test]
    fn test_memory_store_paging() {
        let store = store();
        let opts = RangeOptions {
            page_size: 3,
            ..RangeOptions::default()
        };
        let chunk = store
            .read_page(
                &KeySelector::first_greater_or_equal(Bytes::from_static(b"")),
                &KeySelector::first_greater_or_equal(Bytes::from_static(b"z")),
                &opts,
            )
            .unwrap();
        assert_eq!(chunk.items.len(), 3);
        assert!(chunk.has_more);
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn test_memory_store_fail_after() {
        let store = store();
        store.fail_after(1);
        let begin = KeySelector::first_greater_or_equal(Bytes::from_static(b"a"));
        let end = KeySelector::first_greater_or_equal(Bytes::from_static(b"z"));
        assert!(store.read_page(&begin, &end, &RangeOptions::default()).is_ok());
        let err = store
            .read_page(&begin, &end, &RangeOptions::default())
            .unwrap_err();
        assert!(matches!(err, MergeError::Source(_)));
    }
}
