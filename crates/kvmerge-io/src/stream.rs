//! Paginated range reads exposed as a lazy merge source.
//!
//! The first page is fetched on the first poll, later pages only once the
//! previous one is drained. Each follow-up read starts right after the last
//! key seen.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use kvmerge_core::error::{MergeError, Result};
use kvmerge_core::kv::{KeySelector, KeySelectorPair, KeyValue};
use kvmerge_operators::SourceStream;

use crate::range::{RangeOptions, RangeReader};

pub struct RangeStream;

struct PageState {
    reader: Arc<dyn RangeReader>,
    begin: KeySelector,
    end: KeySelector,
    options: RangeOptions,
    iteration: u32,
    page: std::vec::IntoIter<KeyValue>,
    has_more: bool,
    remaining: Option<usize>,
}

impl PageState {
    async fn fetch(&mut self) -> Result<()> {
        let options = RangeOptions {
            limit: self.remaining,
            ..self.options.clone()
        };
        let chunk = self
            .reader
            .get_range(&self.begin, &self.end, &options, self.iteration)
            .await?;
        tracing::trace!(
            iteration = self.iteration,
            items = chunk.items.len(),
            has_more = chunk.has_more,
            "range page"
        );

        self.iteration += 1;
        // An empty page cannot move `begin` forward; treat it as the end.
        self.has_more = chunk.has_more && !chunk.items.is_empty();
        if let Some(last) = chunk.last() {
            self.begin = KeySelector::first_greater_than(last.key.clone());
        }
        self.page = chunk.items.into_iter();
        Ok(())
    }

    async fn next_pair(&mut self) -> Result<Option<KeyValue>> {
        loop {
            if self.remaining == Some(0) {
                return Ok(None);
            }
            if let Some(kv) = self.page.next() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Ok(Some(kv));
            }
            if !self.has_more {
                return Ok(None);
            }
            self.fetch().await?;
        }
    }
}

impl RangeStream {
    /// Open `pair` against `reader` as an ascending source of pairs.
    pub fn open(
        reader: Arc<dyn RangeReader>,
        pair: KeySelectorPair,
        options: RangeOptions,
    ) -> Result<SourceStream<KeyValue>> {
        if options.reverse {
            return Err(MergeError::invalid(
                "merge sources must be read in ascending order",
            ));
        }
        if options.page_size == 0 {
            return Err(MergeError::invalid("page_size must be at least 1"));
        }

        let state = PageState {
            reader,
            begin: pair.begin,
            end: pair.end,
            remaining: options.limit,
            options,
            iteration: 0,
            page: Vec::new().into_iter(),
            has_more: true,
        };

        let pairs = stream::try_unfold(state, |mut state| async move {
            let next = state.next_pair().await?;
            Ok::<_, MergeError>(next.map(|kv| (kv, state)))
        });
        Ok(pairs.boxed())
    }
}
