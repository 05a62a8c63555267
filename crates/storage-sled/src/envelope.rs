//! On-disk value framing.
//!
//! sled has no native expiry, so every value is wrapped before insertion:
//!
//! ```text
//! +---------+------------------------+-----------------+
//! | version | expiry (u64, BE, ms)   | payload ...     |
//! | 1 byte  | 8 bytes, 0 = no expiry | remaining bytes |
//! +---------+------------------------+-----------------+
//! ```
//!
//! Keys are stored unframed so sled's byte ordering is the key ordering.

use crate::error::{Result, SledStorageError};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Length of the fixed envelope header.
pub const HEADER_LEN: usize = 1 + 8;

/// A decoded value borrowed from the stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Expiry as Unix milliseconds, `None` for non-expiring values.
    pub expires_at_ms: Option<u64>,
    /// The caller's value.
    pub payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Parses a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`SledStorageError::Envelope`] when the bytes are shorter than
    /// the header or carry an unknown version.
    pub fn decode(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SledStorageError::Envelope(format!(
                "value of {} bytes is shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        if header[0] != ENVELOPE_VERSION {
            return Err(SledStorageError::Envelope(format!(
                "unsupported envelope version {}",
                header[0]
            )));
        }
        let mut expiry = [0u8; 8];
        expiry.copy_from_slice(&header[1..]);
        let expires_at_ms = match u64::from_be_bytes(expiry) {
            0 => None,
            ms => Some(ms),
        };
        Ok(Self { expires_at_ms, payload })
    }

    /// Returns `true` if the value is past its deadline at `now_ms`.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|deadline| deadline <= now_ms)
    }
}

/// Frames `payload` with an optional expiry.
///
/// An expiry of `Some(0)` is stored as 1 ms so it is not mistaken for "no
/// expiry"; both are already in the past for any real clock.
#[must_use]
pub fn encode(expires_at_ms: Option<u64>, payload: &[u8]) -> Vec<u8> {
    let raw_expiry = expires_at_ms.map_or(0, |ms| ms.max(1));
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(ENVELOPE_VERSION);
    out.extend_from_slice(&raw_expiry.to_be_bytes());
    out.extend_from_slice(payload);
    out
}
