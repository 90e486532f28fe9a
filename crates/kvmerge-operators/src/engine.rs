//! Merge engine: owns the cursors and drives one `SetOperator` on demand.
//!
//! Pull protocol:
//! - Nothing happens at construction. The first `next()` seeds every cursor.
//! - Each `next()` first advances the cursors that fed the previous result,
//!   then loops on the operator until it emits or reports `Done`.
//! - A pull may be dropped at any await (a timeout, a `select!`). Cursors that
//!   still owe a read stay due and are advanced by the next pull.
//! - A consumer that stops after result k has caused exactly the reads that
//!   result k needed, and no more.
//! - Cancellation is checked at the start of every pull and raced against
//!   every batch of advances; a cancelled read is dropped mid-flight.

use std::fmt;

use futures::future::try_join_all;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use kvmerge_core::cancel::CancelContext;
use kvmerge_core::error::{MergeError, Result};
use kvmerge_core::order::{KeyComparer, SharedComparer};

use crate::cursor::Cursor;
use crate::metrics::{merge_event, MergeStats};
use crate::traits::{Action, KeyFn, ResultFn, SetOperator};

/// Lifecycle of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeState {
    /// Created, no cursor advanced yet.
    Seeding,
    /// Cursors hold data; the operator decides the next step.
    Ready,
    /// A result was handed out; its cursors move on the next pull.
    Emitting,
    /// The operator found no further result.
    Done,
    /// Cancelled by the consumer, or the limit was reached.
    Cancelled,
    /// A source failed. The error was returned once.
    Faulted,
}

impl MergeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MergeState::Done | MergeState::Cancelled | MergeState::Faulted
        )
    }
}

/// Knobs the engine itself reads; the rest of `MergeOptions` belongs to the
/// sources.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EngineSettings {
    pub limit: Option<usize>,
    pub verify_order: bool,
    pub concurrent_advance: bool,
}

/// One running union/intersect/except over a set of sources.
///
/// Sources must all be sorted under the comparer given at construction. This
/// is not checked unless `verify_order` is on.
pub struct MergeStream<S, E, K, R> {
    cursors: Vec<Cursor<S, E, K>>,
    operator: Box<dyn SetOperator<K>>,
    key_of: KeyFn<E, K>,
    project: ResultFn<E, R>,
    comparer: SharedComparer<K>,
    cancel: Option<CancelContext>,
    remaining: Option<usize>,
    verify_order: bool,
    concurrent_advance: bool,
    state: MergeState,
    stats: MergeStats,
}

impl<S, E, K, R> MergeStream<S, E, K, R>
where
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Send + Sync,
{
    pub(crate) fn new(
        sources: Vec<S>,
        operator: Box<dyn SetOperator<K>>,
        key_of: KeyFn<E, K>,
        project: ResultFn<E, R>,
        comparer: SharedComparer<K>,
        cancel: Option<CancelContext>,
        settings: EngineSettings,
    ) -> Self {
        let stats = MergeStats::new(sources.len());
        let cursors = sources
            .into_iter()
            .enumerate()
            .map(|(idx, source)| Cursor::new(idx, source))
            .collect();
        Self {
            cursors,
            operator,
            key_of,
            project,
            comparer,
            cancel,
            remaining: settings.limit,
            verify_order: settings.verify_order,
            concurrent_advance: settings.concurrent_advance,
            state: MergeState::Seeding,
            stats,
        }
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    pub fn operator_name(&self) -> &'static str {
        self.operator.name()
    }

    /// Pull the next result.
    ///
    /// `Ok(None)` ends the sequence: the operator is done, the limit was
    /// reached or the merge was cancelled (see `state()` to tell them apart).
    /// A source failure is returned once as `Err`; every later call returns
    /// `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<R>> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        if self.is_cancelled() {
            self.finish(MergeState::Cancelled);
            return Ok(None);
        }
        self.stats.pulls += 1;

        if self.state == MergeState::Seeding {
            if self.remaining == Some(0) {
                self.finish(MergeState::Cancelled);
                return Ok(None);
            }
            merge_event!(
                debug,
                operator = self.operator.name(),
                sources = self.cursors.len(),
                "seeding cursors"
            );
        }
        // Cursors seeded, emitted from or left behind by an abandoned pull.
        if !self.advance_due().await? {
            return Ok(None);
        }
        self.state = MergeState::Ready;

        loop {
            let action = {
                let heads: Vec<Option<&K>> = self.cursors.iter().map(Cursor::key).collect();
                self.operator.select_next(&heads, self.comparer.as_ref())
            };
            merge_event!(trace, operator = self.operator.name(), ?action, "select");

            match action {
                Action::Done => {
                    self.finish(MergeState::Done);
                    return Ok(None);
                }
                Action::Advance(ids) => {
                    self.mark_due(&ids);
                    if !self.advance_due().await? {
                        return Ok(None);
                    }
                }
                Action::Emit { from, advance } => {
                    let Some(item) = self.cursors.get_mut(from).and_then(Cursor::take_item) else {
                        let err = MergeError::Invariant(format!(
                            "{} emitted from cursor {from} which holds no element",
                            self.operator.name()
                        ));
                        self.finish(MergeState::Faulted);
                        return Err(err);
                    };
                    self.mark_due(&advance);
                    self.stats.emitted += 1;
                    self.state = MergeState::Emitting;

                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                        if *remaining == 0 {
                            self.finish(MergeState::Cancelled);
                        }
                    }
                    return Ok(Some((self.project)(item)));
                }
            }
        }
    }

    /// Drain the merge into a vector.
    pub async fn try_collect(mut self) -> Result<Vec<R>> {
        let mut out = Vec::new();
        while let Some(r) = self.next().await? {
            out.push(r);
        }
        Ok(out)
    }

    /// Adapt the pull API into a `Stream`. An error is the last item.
    pub fn into_stream(self) -> impl Stream<Item = Result<R>> + Send
    where
        S: 'static,
        E: 'static,
        K: 'static,
        R: Send + 'static,
    {
        futures::stream::unfold(self, |mut merge| async move {
            match merge.next().await {
                Ok(Some(r)) => Some((Ok(r), merge)),
                Ok(None) => None,
                Err(e) => Some((Err(e), merge)),
            }
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelContext::is_cancelled)
    }

    fn mark_due(&mut self, ids: &[usize]) {
        for &idx in ids {
            if let Some(cursor) = self.cursors.get_mut(idx) {
                cursor.mark_due();
            }
        }
    }

    /// Advance every due cursor. `Ok(false)` means cancellation was observed
    /// and the merge is now `Cancelled`.
    ///
    /// Safe to drop at any await: a cursor stays due until its own read lands.
    async fn advance_due(&mut self) -> Result<bool> {
        let ids: Vec<usize> = self
            .cursors
            .iter()
            .filter(|cursor| cursor.is_due())
            .map(Cursor::index)
            .collect();
        if ids.is_empty() {
            return Ok(true);
        }
        if self.is_cancelled() {
            self.finish(MergeState::Cancelled);
            return Ok(false);
        }

        let outcome = {
            let work = advance_cursors(
                &mut self.cursors,
                &ids,
                &self.key_of,
                self.comparer.as_ref(),
                self.verify_order,
                self.concurrent_advance,
            );
            match self.cancel.as_ref() {
                Some(ctx) => tokio::select! {
                    biased;
                    _ = ctx.cancelled() => None,
                    res = work => Some(res),
                },
                None => Some(work.await),
            }
        };

        for &idx in &ids {
            if let (Some(cursor), Some(slot)) = (self.cursors.get(idx), self.stats.reads.get_mut(idx)) {
                *slot = cursor.reads();
            }
        }

        match outcome {
            None => {
                self.finish(MergeState::Cancelled);
                Ok(false)
            }
            Some(Err(e)) => {
                merge_event!(warn, operator = self.operator.name(), error = %e, "source failed");
                self.finish(MergeState::Faulted);
                Err(e)
            }
            Some(Ok(())) if self.is_cancelled() => {
                self.finish(MergeState::Cancelled);
                Ok(false)
            }
            Some(Ok(())) => Ok(true),
        }
    }

    /// Enter a terminal state and release every cursor and its source.
    fn finish(&mut self, state: MergeState) {
        self.state = state;
        self.cursors.clear();
        merge_event!(
            debug,
            operator = self.operator.name(),
            ?state,
            emitted = self.stats.emitted,
            reads = self.stats.total_reads(),
            "merge finished"
        );
    }
}

async fn advance_cursors<S, E, K>(
    cursors: &mut [Cursor<S, E, K>],
    ids: &[usize],
    key_of: &KeyFn<E, K>,
    cmp: &dyn KeyComparer<K>,
    verify_order: bool,
    concurrent: bool,
) -> Result<()>
where
    S: Stream<Item = Result<E>> + Send + Unpin,
    E: Send,
    K: Send + Sync,
{
    if concurrent && ids.len() > 1 {
        let batch = cursors
            .iter_mut()
            .filter(|cursor| ids.contains(&cursor.index()))
            .map(|cursor| cursor.advance(key_of, cmp, verify_order));
        try_join_all(batch).await?;
        return Ok(());
    }

    for &idx in ids {
        let cursor = cursors
            .get_mut(idx)
            .ok_or_else(|| MergeError::Invariant(format!("no cursor at index {idx}")))?;
        cursor.advance(key_of, cmp, verify_order).await?;
    }
    Ok(())
}

impl<S, E, K, R> fmt::Debug for MergeStream<S, E, K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeStream")
            .field("operator", &self.operator.name())
            .field("state", &self.state)
            .field("remaining", &self.remaining)
            .field("stats", &self.stats)
            .finish()
    }
}
