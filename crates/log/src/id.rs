//! Monotonic, lexically sortable entry identifiers.
//!
//! An [`EntryId`] is 128 bits laid out like a ULID:
//!
//! ```text
//! +----------------------------+--------------------------------------+
//! | timestamp (48 bits, ms)    | random (80 bits)                     |
//! +----------------------------+--------------------------------------+
//! ```
//!
//! and renders as 26 Crockford base32 characters. The rendering is fixed
//! width and the alphabet is in ASCII order, so comparing two ids as strings
//! (or as key bytes) gives the same answer as comparing them as integers.
//!
//! [`IdGenerator`] issues ids that are strictly increasing per instance. When
//! the clock has not moved past the previous id's millisecond, the previous
//! value is incremented instead of drawing new randomness.

use std::{fmt, str::FromStr, sync::Arc};

use loggate_storage::{Clock, SystemClock, unix_millis};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GeneratorError, ParseIdError};

/// Number of characters in an encoded [`EntryId`].
pub const ENCODED_LEN: usize = 26;

/// Largest Unix-millisecond timestamp an id can carry.
pub const MAX_TIMESTAMP_MS: u64 = (1 << TIMESTAMP_BITS) - 1;

const TIMESTAMP_BITS: u32 = 48;
const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1 << RANDOM_BITS) - 1;

/// Crockford base32, without `I`, `L`, `O` and `U`.
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Identifier of a single log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u128);

impl EntryId {
    /// Wraps a raw 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Builds an id from its two fields. Bits of `random` above 80 are dropped.
    #[must_use]
    pub const fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(((timestamp_ms as u128) << RANDOM_BITS) | (random & RANDOM_MASK))
    }

    /// Returns the raw 128-bit value.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Returns the Unix-millisecond timestamp field.
    #[must_use]
    pub const fn timestamp_ms(self) -> u64 {
        (self.0 >> RANDOM_BITS) as u64
    }

    /// Returns the 80-bit random field.
    #[must_use]
    pub const fn random(self) -> u128 {
        self.0 & RANDOM_MASK
    }

    /// Encodes the id as 26 ASCII bytes.
    #[must_use]
    pub fn encode(self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        let mut rest = self.0;
        for slot in out.iter_mut().rev() {
            *slot = ALPHABET[(rest & 0x1F) as usize];
            rest >>= 5;
        }
        out
    }
}

fn decode_char(byte: u8) -> Option<u8> {
    let upper = byte.to_ascii_uppercase();
    let value = match upper {
        b'0'..=b'9' => upper - b'0',
        b'A'..=b'H' => upper - b'A' + 10,
        b'J' | b'K' => upper - b'J' + 18,
        b'M' | b'N' => upper - b'M' + 20,
        b'P'..=b'T' => upper - b'P' + 22,
        b'V'..=b'Z' => upper - b'V' + 27,
        _ => return None,
    };
    Some(value)
}

impl FromStr for EntryId {
    type Err = ParseIdError;

    /// Parses the 26-character form, accepting either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != ENCODED_LEN {
            return Err(ParseIdError::InvalidLength { len });
        }

        let mut value: u128 = 0;
        for (position, byte) in s.bytes().enumerate() {
            let digit = decode_char(byte).ok_or_else(|| ParseIdError::InvalidCharacter {
                ch: s.get(position..).and_then(|rest| rest.chars().next()).unwrap_or('?'),
                position,
            })?;
            // 26 * 5 = 130 bits; the leading character may only use 3 of them.
            if position == 0 && digit > 7 {
                return Err(ParseIdError::Overflow);
            }
            value = (value << 5) | u128::from(digit);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.encode() {
            fmt::Write::write_char(f, char::from(byte))?;
        }
        Ok(())
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Issues strictly increasing [`EntryId`]s.
///
/// Safe to share between tasks; the read-modify-write of the last issued id
/// happens under one mutex, so concurrent callers are linearised in the
/// order they acquire it.
///
/// # Example
///
/// ```
/// use loggate_log::IdGenerator;
///
/// let ids = IdGenerator::new();
/// let a = ids.next()?;
/// let b = ids.next()?;
/// assert!(a.to_string() < b.to_string());
/// # Ok::<(), loggate_log::GeneratorError>(())
/// ```
pub struct IdGenerator {
    clock: Arc<dyn Clock>,
    last: Mutex<Option<u128>>,
}

impl IdGenerator {
    /// Creates a generator reading the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a generator reading `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock, last: Mutex::new(None) }
    }

    /// Creates a generator whose next id sorts after `last`.
    #[must_use]
    pub fn resume_after(clock: Arc<dyn Clock>, last: EntryId) -> Self {
        Self { clock, last: Mutex::new(Some(last.0)) }
    }

    /// Issues the next id.
    ///
    /// When the clock has advanced past the previous id's millisecond the id
    /// is `now` plus fresh randomness. Otherwise (same millisecond, or the
    /// clock stepped backwards) it is the previous id plus one; a full random
    /// field carries into the timestamp, borrowing the next millisecond.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::ClockOutOfRange`] if the clock reads past year 10889
    /// - [`GeneratorError::Exhausted`] if the previous id was `u128::MAX`
    pub fn next(&self) -> Result<EntryId, GeneratorError> {
        let now_ms = unix_millis(self.clock.now());
        if now_ms > MAX_TIMESTAMP_MS {
            return Err(GeneratorError::ClockOutOfRange { millis: now_ms });
        }

        let mut last = self.last.lock();
        let next = match *last {
            Some(prev) if now_ms <= EntryId(prev).timestamp_ms() => {
                prev.checked_add(1).ok_or(GeneratorError::Exhausted)?
            },
            _ => EntryId::from_parts(now_ms, rand::random::<u128>()).0,
        };
        *last = Some(next);
        Ok(EntryId(next))
    }

    /// Returns the most recently issued id, if any.
    #[must_use]
    pub fn last_issued(&self) -> Option<EntryId> {
        self.last.lock().map(EntryId)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").field("last", &self.last_issued()).finish_non_exhaustive()
    }
}
