//! Key/value pairs and the key-selector vocabulary used to describe range reads.
//!
//! Keys compare as raw bytes (lexicographic), which is the natural order of
//! `Bytes`.

use std::fmt;
use std::ops::Add;

use bytes::Bytes;

use crate::error::{MergeError, Result};

/// One pair returned by a range read.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    pub key: Bytes,
    pub value: Bytes,
}

impl KeyValue {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Key selector usable as `key_selector` for the merge operators.
    pub fn key_of(kv: &KeyValue) -> Bytes {
        kv.key.clone()
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} = {:?}", self.key, self.value)
    }
}

/// A position in the key space, resolved by the store at read time.
///
/// Resolution: take the last key `< key` (or `<= key` when `or_equal`), then
/// move `offset` positions forward. `first_greater_or_equal(k)` is therefore
/// `(k, false, 1)`: the last key below `k`, plus one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeySelector {
    pub key: Bytes,
    pub or_equal: bool,
    pub offset: i32,
}

impl KeySelector {
    pub fn new(key: impl Into<Bytes>, or_equal: bool, offset: i32) -> Self {
        Self {
            key: key.into(),
            or_equal,
            offset,
        }
    }

    pub fn first_greater_or_equal(key: impl Into<Bytes>) -> Self {
        Self::new(key, false, 1)
    }

    pub fn first_greater_than(key: impl Into<Bytes>) -> Self {
        Self::new(key, true, 1)
    }

    pub fn last_less_than(key: impl Into<Bytes>) -> Self {
        Self::new(key, false, 0)
    }

    pub fn last_less_or_equal(key: impl Into<Bytes>) -> Self {
        Self::new(key, true, 0)
    }
}

/// Shifts the offset, saturating at the `i32` bounds.
impl Add<i32> for KeySelector {
    type Output = KeySelector;

    fn add(self, rhs: i32) -> KeySelector {
        KeySelector {
            offset: self.offset.saturating_add(rhs),
            ..self
        }
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match (self.or_equal, self.offset) {
            (false, 1) => return write!(f, "fGE{{{:?}}}", self.key),
            (true, 1) => return write!(f, "fGT{{{:?}}}", self.key),
            (false, 0) => return write!(f, "lLT{{{:?}}}", self.key),
            (true, 0) => return write!(f, "lLE{{{:?}}}", self.key),
            (false, _) => "lLT",
            (true, _) => "lLE",
        };
        write!(f, "{base}{{{:?}}}{:+}", self.key, self.offset)
    }
}

/// Begin/end selectors of one range read. Begin is inclusive, end exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeySelectorPair {
    pub begin: KeySelector,
    pub end: KeySelector,
}

impl KeySelectorPair {
    pub fn new(begin: KeySelector, end: KeySelector) -> Self {
        Self { begin, end }
    }

    /// `[range.begin, range.end)` as selectors.
    pub fn from_range(range: &KeyRange) -> Self {
        Self {
            begin: KeySelector::first_greater_or_equal(range.begin.clone()),
            end: KeySelector::first_greater_or_equal(range.end.clone()),
        }
    }
}

impl From<KeyRange> for KeySelectorPair {
    fn from(range: KeyRange) -> Self {
        Self::from_range(&range)
    }
}

/// Plain `[begin, end)` key boundaries.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyRange {
    pub begin: Bytes,
    pub end: Bytes,
}

impl KeyRange {
    pub fn new(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Every key that starts with `prefix`.
    pub fn starts_with(prefix: impl Into<Bytes>) -> Result<Self> {
        let prefix = prefix.into();
        let end = increment(&prefix)?;
        Ok(Self { begin: prefix, end })
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.begin.as_ref() && key < self.end.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }
}

impl fmt::Debug for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?})", self.begin, self.end)
    }
}

/// Smallest key greater than every key starting with `prefix`.
fn increment(prefix: &[u8]) -> Result<Bytes> {
    let Some(last) = prefix.iter().rposition(|&b| b != 0xFF) else {
        return Err(MergeError::invalid(
            "key prefix must contain at least one byte other than 0xFF",
        ));
    };
    let mut out = prefix[..=last].to_vec();
    out[last] += 1;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_increments_last_byte() {
        let range = KeyRange::starts_with(Bytes::from_static(b"user/")).unwrap();
        assert_eq!(range.end.as_ref(), b"user0");
        assert!(range.contains(b"user/42"));
        assert!(!range.contains(b"user0"));
    }

    #[test]
    fn test_starts_with_strips_trailing_ff() {
        let range = KeyRange::starts_with(Bytes::from_static(&[0x01, 0xFF, 0xFF])).unwrap();
        assert_eq!(range.end.as_ref(), &[0x02]);
        assert!(KeyRange::starts_with(Bytes::from_static(&[0xFF])).is_err());
    }

    #[test]
    fn test_selector_offsets() {
        let sel = KeySelector::first_greater_or_equal(Bytes::from_static(b"a")) + 2;
        assert_eq!(sel.offset, 3);
        assert!(!sel.or_equal);
        assert_eq!(format!("{:?}", KeySelector::first_greater_than(Bytes::from_static(b"a"))), "fGT{b\"a\"}");
    }

    #[test]
    fn test_selector_offset_saturates() {
        let far = KeySelector::new(Bytes::from_static(b"k"), false, i32::MAX - 1) + 10;
        assert_eq!(far.offset, i32::MAX);
        let back = KeySelector::new(Bytes::from_static(b"k"), true, i32::MIN + 1) + -10;
        assert_eq!(back.offset, i32::MIN);
    }
}
