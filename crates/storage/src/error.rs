//! The one error type every engine reports through.

use std::sync::Arc;

use thiserror::Error;

/// Shareable source error, so [`StorageError`] stays `Clone`.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result of a storage operation.
pub type StorageResult<T> = Result<T, StorageError>;

/// Why a storage operation failed.
///
/// Engines translate their own failures into these variants; the log store
/// and the gateway never see engine-specific errors. The gateway answers
/// every variant with a 500 and logs whether it was [transient].
///
/// [transient]: StorageError::is_transient
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A named tree or key the operation required is absent.
    #[error("not found: {key}")]
    NotFound {
        /// What was looked up.
        key: String,
    },

    /// The engine or the device under it could not be reached.
    #[error("storage unavailable: {message}")]
    Connection {
        /// What was being attempted.
        message: String,
        /// Underlying failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Bytes could not be encoded for, or decoded from, the engine.
    #[error("bad stored data: {message}")]
    Serialization {
        /// What was being encoded or decoded.
        message: String,
        /// Underlying failure.
        #[source]
        source: Option<BoxError>,
    },

    /// The engine failed in a way retrying will not fix.
    #[error("storage failure: {message}")]
    Internal {
        /// What went wrong.
        message: String,
        /// Underlying failure.
        #[source]
        source: Option<BoxError>,
    },

    /// The engine did not answer in time.
    #[error("storage timed out")]
    Timeout,

    /// A write's key or value is over the configured ceiling.
    #[error("{kind} of {actual} bytes is over the {limit} byte limit")]
    SizeLimitExceeded {
        /// `"key"` or `"value"`.
        kind: &'static str,
        /// Size of the rejected part.
        actual: usize,
        /// The ceiling it broke.
        limit: usize,
    },
}

impl StorageError {
    /// A [`NotFound`](Self::NotFound) for `key`.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// A [`Connection`](Self::Connection) without a source.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// A [`Connection`](Self::Connection) caused by `source`.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// A [`Serialization`](Self::Serialization) without a source.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// A [`Serialization`](Self::Serialization) caused by `source`.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// An [`Internal`](Self::Internal) without a source.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// An [`Internal`](Self::Internal) caused by `source`.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// A [`Timeout`](Self::Timeout).
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// A [`SizeLimitExceeded`](Self::SizeLimitExceeded).
    #[must_use]
    pub fn size_limit_exceeded(kind: &'static str, actual: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { kind, actual, limit }
    }

    /// Whether the same request could succeed later. Only used for logging;
    /// nothing retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

/// A storage setting that cannot be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A number is under its floor.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Setting name.
        field: &'static str,
        /// Floor.
        min: String,
        /// Supplied value.
        value: String,
    },

    /// A required string or path is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Setting name.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::not_found(StorageError::not_found("logs"), "not found: logs")]
    #[case::timeout(StorageError::timeout(), "storage timed out")]
    #[case::too_big(
        StorageError::size_limit_exceeded("value", 10, 4),
        "value of 10 bytes is over the 4 byte limit"
    )]
    #[case::unavailable(StorageError::connection("flush"), "storage unavailable: flush")]
    fn display(#[case] err: StorageError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_source_survives_clone() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = StorageError::connection_with_source("flush", io).clone();

        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("pipe closed"));
    }

    #[rstest]
    #[case(StorageError::connection("down"), true)]
    #[case(StorageError::timeout(), true)]
    #[case(StorageError::serialization("bad json"), false)]
    #[case(StorageError::internal("bug"), false)]
    #[case(StorageError::not_found("k"), false)]
    fn transient(#[case] err: StorageError, #[case] expected: bool) {
        assert_eq!(err.is_transient(), expected);
    }
}
