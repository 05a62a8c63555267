//! The log entry record.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single log event: who sent it, on which channel, and what it says.
///
/// Values of this type are always valid: `channel` and `user` are non-empty.
/// Deserialisation enforces the same rules as [`LogEntry::new`] and rejects
/// objects with missing, mistyped or extra fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLogEntry")]
pub struct LogEntry {
    channel: String,
    user: String,
    content: String,
}

/// Wire shape before validation.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogEntry {
    channel: String,
    user: String,
    content: String,
}

impl TryFrom<RawLogEntry> for LogEntry {
    type Error = ValidationError;

    fn try_from(raw: RawLogEntry) -> Result<Self, Self::Error> {
        Self::new(raw.channel, raw.user, raw.content)
    }
}

impl LogEntry {
    /// Creates a validated entry. `content` may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] if `channel` or `user` is empty.
    pub fn new(
        channel: impl Into<String>,
        user: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let (channel, user) = (channel.into(), user.into());
        if channel.is_empty() {
            return Err(ValidationError::EmptyField { field: "channel" });
        }
        if user.is_empty() {
            return Err(ValidationError::EmptyField { field: "user" });
        }
        Ok(Self { channel, user, content: content.into() })
    }

    /// Parses and validates a JSON request body.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Malformed`] if the body is not a JSON object with
    ///   exactly the string fields `channel`, `user` and `content`
    /// - [`ValidationError::EmptyField`] if `channel` or `user` is empty
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        // Parse as a map first: serde would otherwise accept a bare array.
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
            .map_err(|err| ValidationError::malformed(err.to_string()))?;
        let raw: RawLogEntry = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|err| ValidationError::malformed(err.to_string()))?;
        Self::try_from(raw)
    }

    /// Serialises the entry as the JSON object stored in the backend.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures, which do not occur for string fields
    /// in practice.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Logical source or category.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Originator identity.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Message payload.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}
