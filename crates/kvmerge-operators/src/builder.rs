//! Construction surface of the three operators.
//!
//! `union`, `intersect` and `except` return a `MergeBuilder`. Arguments are
//! validated when the builder is finished with `build()` or `select(..)`,
//! before any source is read; the returned `MergeStream` does nothing until
//! its first `next()`.

use std::sync::Arc;

use futures::Stream;

use kvmerge_core::cancel::CancelContext;
use kvmerge_core::config::MergeOptions;
use kvmerge_core::error::{MergeError, Result};
use kvmerge_core::order::{KeyComparer, NaturalOrder, SharedComparer};

use crate::engine::{EngineSettings, MergeStream};
use crate::ops::OperatorKind;
use crate::traits::KeyFn;

pub struct MergeBuilder<S, E, K> {
    kind: OperatorKind,
    sources: Vec<S>,
    key_of: KeyFn<E, K>,
    comparer: SharedComparer<K>,
    options: MergeOptions,
    cancel: Option<CancelContext>,
}

impl<S, E, K> MergeBuilder<S, E, K>
where
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Send + Sync + 'static,
{
    fn new(
        kind: OperatorKind,
        sources: Vec<S>,
        key_of: KeyFn<E, K>,
        comparer: SharedComparer<K>,
    ) -> Self {
        Self {
            kind,
            sources,
            key_of,
            comparer,
            options: MergeOptions::default(),
            cancel: None,
        }
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    /// Replace the key ordering. Every source must be sorted under it.
    pub fn with_comparer(mut self, comparer: impl KeyComparer<K> + 'static) -> Self {
        self.comparer = Arc::new(comparer);
        self
    }

    pub fn with_shared_comparer(mut self, comparer: SharedComparer<K>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Replace every option at once (limit included).
    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelContext) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Finish with a projection applied to every emitted element.
    pub fn select<R, F>(self, result_selector: F) -> Result<MergeStream<S, E, K, R>>
    where
        F: FnMut(E) -> R + Send + 'static,
    {
        let min = self.kind.min_sources();
        if self.sources.len() < min {
            return Err(MergeError::invalid(format!(
                "{} needs at least {min} source(s), got {}",
                self.kind.name(),
                self.sources.len()
            )));
        }
        self.options.validate()?;

        let settings = EngineSettings {
            limit: self.options.limit,
            verify_order: self.options.verify_order,
            concurrent_advance: self.options.concurrent_advance,
        };
        Ok(MergeStream::new(
            self.sources,
            self.kind.into_operator(),
            self.key_of,
            Box::new(result_selector),
            self.comparer,
            self.cancel,
            settings,
        ))
    }

    /// Finish without projection: results are the source elements themselves.
    pub fn build(self) -> Result<MergeStream<S, E, K, E>>
    where
        E: 'static,
    {
        self.select(|element| element)
    }
}

fn builder<S, E, K, I, F>(kind: OperatorKind, sources: I, key_selector: F) -> MergeBuilder<S, E, K>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Ord + Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    MergeBuilder::new(
        kind,
        sources.into_iter().collect(),
        Arc::new(key_selector),
        Arc::new(NaturalOrder),
    )
}

/// All elements of all sources in one ordered sequence, duplicates kept.
pub fn union<S, E, K, I, F>(sources: I, key_selector: F) -> MergeBuilder<S, E, K>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Ord + Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    builder(OperatorKind::Union, sources, key_selector)
}

/// Elements whose key is present in every source. The element of the first
/// source is the one emitted.
pub fn intersect<S, E, K, I, F>(sources: I, key_selector: F) -> MergeBuilder<S, E, K>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Ord + Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    builder(OperatorKind::Intersect, sources, key_selector)
}

/// Elements of the first source whose key occurs in none of the others.
pub fn except<S, E, K, I, F>(sources: I, key_selector: F) -> MergeBuilder<S, E, K>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Ord + Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    builder(OperatorKind::Except, sources, key_selector)
}

/// Any operator over keys that are not `Ord`, with an explicit comparer.
pub fn merge_by<S, E, K, I, F, C>(
    kind: OperatorKind,
    sources: I,
    key_selector: F,
    comparer: C,
) -> MergeBuilder<S, E, K>
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
    C: KeyComparer<K> + 'static,
{
    MergeBuilder::new(
        kind,
        sources.into_iter().collect(),
        Arc::new(key_selector),
        Arc::new(comparer),
    )
}

/// `intersect` over exactly two sources.
pub fn intersect_pair<S, E, K, F>(first: S, second: S, key_selector: F) -> MergeBuilder<S, E, K>
where
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Ord + Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    intersect([first, second], key_selector)
}

/// `except` over exactly two sources: `first` minus `second`.
pub fn except_pair<S, E, K, F>(first: S, second: S, key_selector: F) -> MergeBuilder<S, E, K>
where
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Ord + Send + Sync + 'static,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    except([first, second], key_selector)
}
