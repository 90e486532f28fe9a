//! The range-read collaborator: one paginated read against a sorted store.

use std::sync::Arc;

use futures::future::BoxFuture;

use kvmerge_core::config::MergeOptions;
use kvmerge_core::kv::{KeySelector, KeyValue};
use kvmerge_core::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeOptions {
    /// Total number of pairs to return across all pages.
    pub limit: Option<usize>,
    /// Pairs requested per read.
    pub page_size: usize,
    /// Descending reads. Merges need ascending input, so `RangeStream`
    /// rejects this.
    pub reverse: bool,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            limit: None,
            page_size: 256,
            reverse: false,
        }
    }
}

impl RangeOptions {
    /// Largest page a reader may return for this request.
    pub fn page_limit(&self) -> usize {
        let page = self.page_size.max(1);
        self.limit.map_or(page, |limit| limit.min(page))
    }
}

impl From<&MergeOptions> for RangeOptions {
    fn from(options: &MergeOptions) -> Self {
        Self {
            page_size: options.page_size,
            ..Self::default()
        }
    }
}

/// One page of a range read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeChunk {
    pub items: Vec<KeyValue>,
    /// More pairs exist in the range past the last item of this page.
    pub has_more: bool,
}

impl RangeChunk {
    pub fn last(&self) -> Option<&KeyValue> {
        self.items.last()
    }
}

/// A sorted store that can serve `[begin, end)` range reads page by page.
///
/// `iteration` counts the pages already fetched for the same logical read;
/// stores may use it to grow page sizes. Implementations return at most
/// `options.page_limit()` pairs, in ascending key order.
pub trait RangeReader: Send + Sync {
    fn get_range<'a>(
        &'a self,
        begin: &'a KeySelector,
        end: &'a KeySelector,
        options: &'a RangeOptions,
        iteration: u32,
    ) -> BoxFuture<'a, Result<RangeChunk>>;
}

impl<T: RangeReader + ?Sized> RangeReader for Arc<T> {
    fn get_range<'a>(
        &'a self,
        begin: &'a KeySelector,
        end: &'a KeySelector,
        options: &'a RangeOptions,
        iteration: u32,
    ) -> BoxFuture<'a, Result<RangeChunk>> {
        (**self).get_range(begin, end, options, iteration)
    }
}
