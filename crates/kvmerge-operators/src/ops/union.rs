//! Union: k-way merge of all sources, like the merge phase of an external sort.
//!
//! No deduplication. Equal keys come out in source order, then in the order
//! each source produced them.

use kvmerge_core::order::KeyComparer;

use crate::traits::{Action, SetOperator};

#[derive(Debug, Clone, Copy, Default)]
pub struct Union;

impl Union {
    pub(crate) const fn name_static(self) -> &'static str {
        "union"
    }
}

impl<K> SetOperator<K> for Union {
    fn name(&self) -> &'static str {
        self.name_static()
    }

    fn select_next(&self, heads: &[Option<&K>], cmp: &dyn KeyComparer<K>) -> Action {
        // Strictly-less keeps the lowest source index among equal minima.
        let mut best: Option<(usize, &K)> = None;
        for (idx, head) in heads.iter().enumerate() {
            let Some(key) = *head else { continue };
            match best {
                Some((_, best_key)) if !cmp.compare(key, best_key).is_lt() => {}
                _ => best = Some((idx, key)),
            }
        }

        match best {
            Some((idx, _)) => Action::emit_and_advance(idx),
            None => Action::Done,
        }
    }
}
