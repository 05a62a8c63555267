//! Storage keys for log entries.
//!
//! Every entry lives under the `logs` namespace. In the backend the key is
//! the namespace, a `0x00` separator, then the 26-byte encoded id:
//!
//! ```text
//! l o g s 00 0 1 H ... (26 bytes)
//! ```
//!
//! Over the wire the same key is the pair `["logs", "<id>"]`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    error::KeyError,
    id::{ENCODED_LEN, EntryId},
};

/// Namespace segment shared by every log key.
pub const NAMESPACE: &str = "logs";

/// Byte prefix of every log key in the backend.
pub const NAMESPACE_PREFIX: &[u8] = b"logs\x00";

/// Key of a stored log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    id: EntryId,
}

impl EntryKey {
    /// Creates the key for `id`.
    #[must_use]
    pub const fn new(id: EntryId) -> Self {
        Self { id }
    }

    /// Returns the entry's identifier.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// Encodes the key for the backend.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NAMESPACE_PREFIX.len() + ENCODED_LEN);
        out.extend_from_slice(NAMESPACE_PREFIX);
        out.extend_from_slice(&self.id.encode());
        out
    }

    /// Decodes a key read from the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if the bytes lack the namespace prefix or the
    /// remainder is not an encoded id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let rest = bytes.strip_prefix(NAMESPACE_PREFIX).ok_or(KeyError::WrongNamespace)?;
        let text = std::str::from_utf8(rest).map_err(|_| KeyError::NotUtf8)?;
        Ok(Self { id: text.parse()? })
    }
}

impl From<EntryId> for EntryKey {
    fn from(id: EntryId) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NAMESPACE}/{}", self.id)
    }
}

impl Serialize for EntryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (NAMESPACE, &self.id).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (namespace, id) = <(String, EntryId)>::deserialize(deserializer)?;
        if namespace != NAMESPACE {
            return Err(de::Error::invalid_value(de::Unexpected::Str(&namespace), &NAMESPACE));
        }
        Ok(Self { id })
    }
}
