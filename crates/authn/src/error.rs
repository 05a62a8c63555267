//! Authentication error types.
//!
//! Both request-time variants map to `401 Unauthorized` at the HTTP layer;
//! they are kept apart so logs can tell a misconfigured client from a wrong
//! key.

use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The request carried no credential header.
    #[error("Missing credential")]
    MissingCredential,

    /// The credential does not match the configured secret.
    #[error("Invalid credential")]
    InvalidCredential,

    /// A secret cannot be configured as empty.
    #[error("Shared secret must not be empty")]
    EmptySecret,
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
