//! Ordering contract shared by every operator.
//!
//! All sources fed into one merge must be non-decreasing under the same
//! comparer. This is a precondition, not something the engine sorts for you:
//! an unsorted source produces wrong output unless `MergeOptions::verify_order`
//! is on, in which case the merge fails with `OrderingViolation`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Total order over extracted keys.
pub trait KeyComparer<K: ?Sized>: Send + Sync {
    fn compare(&self, left: &K, right: &K) -> Ordering;

    /// Whether `current` breaks monotonicity after `previous`.
    fn violates_monotonicity(&self, previous: &K, current: &K) -> bool {
        self.compare(previous, current).is_gt()
    }

    /// Label used in diagnostics.
    fn label(&self) -> &'static str {
        "custom"
    }
}

/// The key type's own `Ord`. Default comparer for every operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> KeyComparer<K> for NaturalOrder {
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }

    fn label(&self) -> &'static str {
        "ASC"
    }
}

/// Flips another comparer. Sources must then be sorted descending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reversed<C>(pub C);

impl<K: ?Sized, C: KeyComparer<K>> KeyComparer<K> for Reversed<C> {
    fn compare(&self, left: &K, right: &K) -> Ordering {
        self.0.compare(right, left)
    }

    fn label(&self) -> &'static str {
        "DESC"
    }
}

/// Adapts a plain closure into a comparer.
#[derive(Clone)]
pub struct FnComparer<F>(pub F);

impl<F> fmt::Debug for FnComparer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComparer").finish()
    }
}

impl<K: ?Sized, F> KeyComparer<K> for FnComparer<F>
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    fn compare(&self, left: &K, right: &K) -> Ordering {
        (self.0)(left, right)
    }
}

/// Shared, type-erased comparer as stored by the merge engine.
pub type SharedComparer<K> = Arc<dyn KeyComparer<K>>;

/// Shorthand for the default comparer as a `SharedComparer`.
pub fn natural<K: Ord + 'static>() -> SharedComparer<K> {
    Arc::new(NaturalOrder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_flips_natural() {
        let cmp = Reversed(NaturalOrder);
        assert_eq!(KeyComparer::<i32>::compare(&cmp, &1, &2), Ordering::Greater);
        assert!(KeyComparer::<i32>::violates_monotonicity(&cmp, &1, &2));
        assert!(!KeyComparer::<i32>::violates_monotonicity(&cmp, &2, &2));
    }

    #[test]
    fn test_fn_comparer_case_insensitive() {
        let cmp = FnComparer(|a: &String, b: &String| a.to_lowercase().cmp(&b.to_lowercase()));
        assert_eq!(cmp.compare(&"abc".to_string(), &"ABC".to_string()), Ordering::Equal);
    }
}
