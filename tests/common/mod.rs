//! Shared source builders for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kvmerge::{MergeError, SourceStream};

pub type Row = (u32, &'static str);

pub fn key(row: &Row) -> u32 {
    row.0
}

pub fn keys(rows: &[Row]) -> Vec<u32> {
    rows.iter().map(|r| r.0).collect()
}

/// Source that yields `items` in order.
pub fn vec_source<E: Send + 'static>(items: Vec<E>) -> SourceStream<E> {
    stream::iter(items.into_iter().map(Ok::<E, MergeError>)).boxed()
}

/// Source that counts every poll for an element, end-of-stream included.
pub fn counted_source<E: Send + 'static>(items: Vec<E>) -> (SourceStream<E>, Arc<AtomicUsize>) {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    let source = stream::unfold(items.into_iter(), move |mut rest| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            rest.next().map(|item| (Ok::<E, MergeError>(item), rest))
        }
    })
    .boxed();
    (source, polls)
}

/// Source that yields `items`, then fails.
pub fn failing_source<E: Send + 'static>(items: Vec<E>, message: &'static str) -> SourceStream<E> {
    stream::iter(items.into_iter().map(Ok::<E, MergeError>))
        .chain(stream::once(async move {
            Err(MergeError::source_failure(message))
        }))
        .boxed()
}

/// Source that never produces anything.
pub fn pending_source<E: Send + 'static>() -> SourceStream<E> {
    stream::pending().boxed()
}

/// Source that sleeps `delay` before every element.
pub fn slow_source<E: Send + 'static>(items: Vec<E>, delay: Duration) -> SourceStream<E> {
    stream::iter(items)
        .then(move |item| async move {
            tokio::time::sleep(delay).await;
            Ok::<E, MergeError>(item)
        })
        .boxed()
}

/// Sorted keys drawn from `0..max`, possibly with duplicates.
pub fn random_sorted(rng: &mut StdRng, len: usize, max: u32) -> Vec<u32> {
    let mut out: Vec<u32> = (0..len).map(|_| rng.gen_range(0..max)).collect();
    out.sort_unstable();
    out
}

/// Sorted, duplicate-free keys drawn from `0..max`.
pub fn random_set(rng: &mut StdRng, len: usize, max: u32) -> Vec<u32> {
    let mut out = random_sorted(rng, len, max);
    out.dedup();
    out
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
