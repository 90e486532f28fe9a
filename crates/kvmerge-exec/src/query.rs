//! Range-level merge queries.
//!
//! Each entry point opens one `RangeStream` per selector pair against the
//! same reader and hands back a `MergeBuilder` with `options` applied. No
//! range is read until the first `next()` of the finished stream.
//!
//! ```ignore
//! let reader: Arc<dyn RangeReader> = Arc::new(store);
//! let pairs = vec![KeyRange::starts_with("a/")?.into(), KeyRange::starts_with("b/")?.into()];
//! let merged = merge_sort(reader, pairs, |kv: &KeyValue| kv.key.slice(2..), options)?
//!     .build()?
//!     .try_collect()
//!     .await?;
//! ```

use std::sync::Arc;

use kvmerge_core::config::MergeOptions;
use kvmerge_core::error::Result;
use kvmerge_core::kv::{KeyRange, KeySelectorPair, KeyValue};
use kvmerge_core::order::NaturalOrder;
use kvmerge_io::{RangeOptions, RangeReader, RangeStream};
use kvmerge_operators::{merge_by, MergeBuilder, OperatorKind, SourceStream};

use crate::metrics::emit_span;

/// Builder returned by the range-level queries.
pub type RangeMerge<K> = MergeBuilder<SourceStream<KeyValue>, KeyValue, K>;

/// Open every pair as a range source and prepare `kind` over them.
pub fn range_merge<I, K, F>(
    kind: OperatorKind,
    reader: Arc<dyn RangeReader>,
    pairs: I,
    key_selector: F,
    options: MergeOptions,
) -> Result<RangeMerge<K>>
where
    I: IntoIterator<Item = KeySelectorPair>,
    K: Ord + Send + Sync + 'static,
    F: Fn(&KeyValue) -> K + Send + Sync + 'static,
{
    options.validate()?;
    let range_options = RangeOptions::from(&options);

    let sources = pairs
        .into_iter()
        .map(|pair| RangeStream::open(Arc::clone(&reader), pair, range_options.clone()))
        .collect::<Result<Vec<_>>>()?;

    emit_span(
        "range_merge",
        &[
            ("operator", kind.name().to_string()),
            ("sources", sources.len().to_string()),
            ("page_size", range_options.page_size.to_string()),
            (
                "limit",
                options.limit.map_or_else(|| "none".to_string(), |l| l.to_string()),
            ),
        ],
    );

    Ok(merge_by(kind, sources, key_selector, NaturalOrder).with_options(options))
}

/// Union of several ranges, ordered by `key_selector`. Duplicates are kept.
pub fn merge_sort<I, K, F>(
    reader: Arc<dyn RangeReader>,
    pairs: I,
    key_selector: F,
    options: MergeOptions,
) -> Result<RangeMerge<K>>
where
    I: IntoIterator<Item = KeySelectorPair>,
    K: Ord + Send + Sync + 'static,
    F: Fn(&KeyValue) -> K + Send + Sync + 'static,
{
    range_merge(OperatorKind::Union, reader, pairs, key_selector, options)
}

/// Pairs of the first range whose key appears in every other range.
pub fn intersect<I, K, F>(
    reader: Arc<dyn RangeReader>,
    pairs: I,
    key_selector: F,
    options: MergeOptions,
) -> Result<RangeMerge<K>>
where
    I: IntoIterator<Item = KeySelectorPair>,
    K: Ord + Send + Sync + 'static,
    F: Fn(&KeyValue) -> K + Send + Sync + 'static,
{
    range_merge(OperatorKind::Intersect, reader, pairs, key_selector, options)
}

/// Pairs of the first range whose key appears in none of the other ranges.
pub fn except<I, K, F>(
    reader: Arc<dyn RangeReader>,
    pairs: I,
    key_selector: F,
    options: MergeOptions,
) -> Result<RangeMerge<K>>
where
    I: IntoIterator<Item = KeySelectorPair>,
    K: Ord + Send + Sync + 'static,
    F: Fn(&KeyValue) -> K + Send + Sync + 'static,
{
    range_merge(OperatorKind::Except, reader, pairs, key_selector, options)
}

/// `except` over plain `[begin, end)` ranges.
pub fn except_ranges<I, K, F>(
    reader: Arc<dyn RangeReader>,
    ranges: I,
    key_selector: F,
    options: MergeOptions,
) -> Result<RangeMerge<K>>
where
    I: IntoIterator<Item = KeyRange>,
    K: Ord + Send + Sync + 'static,
    F: Fn(&KeyValue) -> K + Send + Sync + 'static,
{
    except(
        reader,
        ranges.into_iter().map(KeySelectorPair::from),
        key_selector,
        options,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use kvmerge_core::error::MergeError;
    use kvmerge_io::MemoryStore;

    fn suffix(kv: &KeyValue) -> Bytes {
        kv.key.slice(2..)
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for k in ["a/1", "a/3", "a/5", "b/2", "b/3", "b/5"] {
            store.insert(Bytes::from(k), Bytes::from(k.to_uppercase()));
        }
        store
    }

    fn prefix(p: &str) -> KeySelectorPair {
        KeyRange::starts_with(p.to_string()).unwrap().into()
    }

    #[tokio::test]
    async fn test_merge_sort_over_prefixes() {
        let store = store();
        let options = MergeOptions::default().with_page_size(2);
        let merged = merge_sort(
            Arc::new(store.clone()),
            vec![prefix("a/"), prefix("b/")],
            suffix,
            options,
        )
        .unwrap()
        .select(|kv| kv.key)
        .unwrap()
        .try_collect()
        .await
        .unwrap();

        let keys: Vec<&[u8]> = merged.iter().map(|k| k.as_ref()).collect();
        assert_eq!(
            keys,
            vec![b"a/1".as_ref(), b"b/2", b"a/3", b"b/3", b"a/5", b"b/5"]
        );
    }

    #[tokio::test]
    async fn test_except_ranges_keeps_first_range_only_keys() {
        let store = store();
        let ranges = vec![
            KeyRange::starts_with("a/").unwrap(),
            KeyRange::starts_with("b/").unwrap(),
        ];
        let rest = except_ranges(Arc::new(store), ranges, suffix, MergeOptions::default())
            .unwrap()
            .build()
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rest, vec![KeyValue::new("a/1", "A/1")]);
    }

    #[test]
    fn test_invalid_options_rejected_before_io() {
        let store = store();
        let options = MergeOptions::default().with_page_size(0);
        let err = intersect(Arc::new(store.clone()), vec![prefix("a/")], suffix, options)
            .err()
            .unwrap();
        assert!(matches!(err, MergeError::Config(_)));
        assert_eq!(store.reads(), 0);
    }
}
