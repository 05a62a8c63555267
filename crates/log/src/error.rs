//! Error types for the log store.
//!
//! # Error Types
//!
//! - [`ValidationError`] - An inbound entry is malformed; nothing was stored
//! - [`GeneratorError`] - No identifier could be issued for this call
//! - [`ParseIdError`] - A string is not a valid entry identifier
//! - [`KeyError`] - Stored key bytes do not belong to the log namespace
//! - [`LogError`] - Umbrella error returned by [`LogStore`](crate::LogStore)
//!
//! Storage failures are carried as [`StorageError`] unchanged, so callers see
//! exactly what the backend reported.

use loggate_storage::StorageError;
use thiserror::Error;

/// Result type alias for log store operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors returned by [`LogStore`](crate::LogStore) operations.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum LogError {
    /// The entry failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend failed the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No identifier could be generated.
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

/// A log entry payload that cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A field that must carry text is empty.
    #[error("field `{field}` must not be empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// The payload is not a JSON object with exactly `channel`, `user` and
    /// `content` string fields.
    #[error("malformed log entry: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },
}

impl ValidationError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed { message: message.into() }
    }
}

/// Failure to issue an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GeneratorError {
    /// Every 128-bit identifier after the last issued one is taken.
    #[error("identifier space exhausted")]
    Exhausted,

    /// The clock reads a time the 48-bit timestamp field cannot hold.
    #[error("clock reading of {millis} ms is outside the identifier timestamp range")]
    ClockOutOfRange {
        /// The offending Unix-millisecond reading.
        millis: u64,
    },
}

/// A string that is not a valid [`EntryId`](crate::EntryId).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseIdError {
    /// Wrong number of characters.
    #[error("identifier must be 26 characters, got {len}")]
    InvalidLength {
        /// Length of the rejected input.
        len: usize,
    },

    /// A character outside the Crockford base32 alphabet.
    #[error("invalid character {ch:?} at position {position}")]
    InvalidCharacter {
        /// The rejected character.
        ch: char,
        /// Zero-based position in the input.
        position: usize,
    },

    /// The value does not fit in 128 bits.
    #[error("identifier exceeds 128 bits")]
    Overflow,
}

/// Stored key bytes that do not decode to an [`EntryKey`](crate::EntryKey).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum KeyError {
    /// The key lacks the `logs` namespace prefix.
    #[error("key is outside the log namespace")]
    WrongNamespace,

    /// The identifier segment is not valid UTF-8.
    #[error("identifier segment is not UTF-8")]
    NotUtf8,

    /// The identifier segment does not parse.
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
}
