//! Intersect: leapfrog join on equal keys.
//!
//! Only the cursors holding the smallest key move; they cannot match anything
//! until they catch up with the others. When every cursor agrees, the element
//! of the first source is emitted and all cursors move.

use kvmerge_core::order::KeyComparer;

use crate::traits::{Action, SetOperator};

#[derive(Debug, Clone, Copy, Default)]
pub struct Intersect;

impl Intersect {
    pub(crate) const fn name_static(self) -> &'static str {
        "intersect"
    }
}

impl<K> SetOperator<K> for Intersect {
    fn name(&self) -> &'static str {
        self.name_static()
    }

    fn select_next(&self, heads: &[Option<&K>], cmp: &dyn KeyComparer<K>) -> Action {
        // One exhausted side means no larger key can ever match again.
        let Some(keys) = heads.iter().copied().collect::<Option<Vec<&K>>>() else {
            return Action::Done;
        };
        let Some(&first) = keys.first() else {
            return Action::Done;
        };

        let min = keys
            .iter()
            .copied()
            .fold(first, |min, key| if cmp.compare(key, min).is_lt() { key } else { min });

        let losers: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, key)| cmp.compare(key, min).is_eq())
            .map(|(idx, _)| idx)
            .collect();

        if losers.len() == keys.len() {
            Action::Emit {
                from: 0,
                advance: losers,
            }
        } else {
            Action::Advance(losers)
        }
    }
}
