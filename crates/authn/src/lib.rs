//! # loggate Authentication
//!
//! Shared-secret authentication for the loggate HTTP gateway.
//!
//! Every request except CORS preflight carries the secret in the
//! [`PRESHARED_KEY_HEADER`] header. [`SharedSecret::verify`] compares it with
//! the configured value.
//!
//! ## Security
//!
//! - The configured secret lives in zeroizing memory and never appears in
//!   `Debug` output
//! - Comparison hashes both sides with SHA-256 and folds the digests without
//!   early exit, so timing reveals neither the secret's content nor its length
//! - A server still running on [`DEFAULT_SECRET`] can detect it via
//!   [`SharedSecret::is_default`] and warn
//!
//! ## Example
//!
//! ```
//! use loggate_authn::{AuthError, SharedSecret};
//!
//! let secret = SharedSecret::new("s3cr3t")?;
//!
//! assert!(secret.verify(Some("s3cr3t")).is_ok());
//! assert!(matches!(secret.verify(Some("guess")), Err(AuthError::InvalidCredential)));
//! assert!(matches!(secret.verify(None), Err(AuthError::MissingCredential)));
//! # Ok::<(), AuthError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Authentication error types.
pub mod error;
/// The shared secret and its comparison.
pub mod secret;

pub use error::{AuthError, Result};
pub use secret::{DEFAULT_SECRET, PRESHARED_KEY_HEADER, SharedSecret};
