//! Except: anti-join of the first source against the union of the others.

use kvmerge_core::order::KeyComparer;

use crate::traits::{Action, SetOperator};

/// Cursor 0 is the primary; every other cursor is a subtractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Except;

impl Except {
    pub(crate) const fn name_static(self) -> &'static str {
        "except"
    }
}

impl<K> SetOperator<K> for Except {
    fn name(&self) -> &'static str {
        self.name_static()
    }

    fn min_sources(&self) -> usize {
        2
    }

    fn select_next(&self, heads: &[Option<&K>], cmp: &dyn KeyComparer<K>) -> Action {
        let Some(Some(key)) = heads.first().copied() else {
            return Action::Done;
        };
        let subtractors = || heads.iter().enumerate().skip(1);

        // Subtractors behind the primary can never match it again.
        let behind: Vec<usize> = subtractors()
            .filter(|(_, head)| head.is_some_and(|sub| cmp.compare(sub, key).is_lt()))
            .map(|(idx, _)| idx)
            .collect();
        if !behind.is_empty() {
            return Action::Advance(behind);
        }

        let matched = subtractors().any(|(_, head)| head.is_some_and(|sub| cmp.compare(sub, key).is_eq()));
        if matched {
            Action::Advance(vec![0])
        } else {
            Action::emit_and_advance(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use kvmerge_core::order::NaturalOrder;

    use super::*;

    #[test]
    fn test_catches_up_lagging_subtractors() {
        let heads = [Some(&5), Some(&1), Some(&7), Some(&4)];
        assert_eq!(
            Except.select_next(&heads, &NaturalOrder),
            Action::Advance(vec![1, 3])
        );
    }

    #[test]
    fn test_match_suppresses_primary() {
        let heads = [Some(&5), Some(&9), Some(&5)];
        assert_eq!(Except.select_next(&heads, &NaturalOrder), Action::Advance(vec![0]));
    }

    #[test]
    fn test_emits_when_no_subtractor_matches() {
        let heads = [Some(&5), None, Some(&6)];
        assert_eq!(
            Except.select_next(&heads, &NaturalOrder),
            Action::emit_and_advance(0)
        );
    }

    #[test]
    fn test_done_when_primary_exhausted() {
        let heads = [None, Some(&1)];
        assert_eq!(Except.select_next(&heads, &NaturalOrder), Action::Done);
    }
}
