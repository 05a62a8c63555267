//! Common types used across storage operations.

use std::ops::{Bound, Range, RangeBounds};

use bytes::Bytes;

/// Key-value pair returned from range queries.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use loggate_storage::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("logs:1"), Bytes::from(r#"{"user":"u1"}"#));
/// assert_eq!(kv.key, Bytes::from("logs:1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: Bytes,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Returns the half-open range covering every key that starts with `prefix`.
///
/// The upper bound is the smallest byte string greater than all keys with
/// the prefix: trailing `0xFF` bytes are dropped and the last remaining byte
/// is incremented. A prefix made only of `0xFF` bytes (or an empty prefix)
/// has no finite successor, so the range is capped with a key of `0xFF`
/// bytes one longer than the prefix; range queries over such prefixes should
/// prefer an unbounded end.
///
/// # Examples
///
/// ```
/// use loggate_storage::prefix_range;
///
/// let range = prefix_range(b"logs\x00");
/// assert_eq!(range.start, b"logs\x00".to_vec());
/// assert_eq!(range.end, b"logs\x01".to_vec());
/// ```
#[must_use]
pub fn prefix_range(prefix: &[u8]) -> Range<Vec<u8>> {
    let start = prefix.to_vec();
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return start..end;
        }
    }
    start..vec![u8::MAX; prefix.len() + 1]
}

/// Borrows the bounds of a byte-key range as slices.
pub fn range_as_slices<R>(range: &R) -> (Bound<&[u8]>, Bound<&[u8]>)
where
    R: RangeBounds<Vec<u8>>,
{
    (range.start_bound().map(Vec::as_slice), range.end_bound().map(Vec::as_slice))
}

/// Returns `true` when no key can fall inside `range`.
///
/// Ordered maps panic on inverted bounds, so backends check this first and
/// answer with an empty result instead.
pub fn is_empty_range<R>(range: &R) -> bool
where
    R: RangeBounds<Vec<u8>>,
{
    match (range.start_bound(), range.end_bound()) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s), Bound::Excluded(e))
        | (Bound::Excluded(s), Bound::Included(e))
        | (Bound::Excluded(s), Bound::Excluded(e)) => s >= e,
        _ => false,
    }
}
