//! Shared-secret verification.

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::AuthError;

/// Request header carrying the shared secret (lowercase, as HTTP/2 sends it).
pub const PRESHARED_KEY_HEADER: &str = "x-preshared-key";

/// Secret used when none is configured.
///
/// Anyone can read this value from the source, so a deployment relying on it
/// is effectively unauthenticated.
pub const DEFAULT_SECRET: &str = "DEFAULT_SECRET";

/// The configured secret every request must present.
///
/// Cloning copies the secret; every copy is zeroed on drop.
#[derive(Clone)]
pub struct SharedSecret {
    secret: Zeroizing<String>,
}

impl SharedSecret {
    /// Wraps a configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptySecret`] if `secret` is empty, since an empty
    /// header would otherwise authenticate.
    pub fn new(secret: impl Into<String>) -> Result<Self, AuthError> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        Ok(Self { secret })
    }

    /// Returns `true` when this is [`DEFAULT_SECRET`].
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.matches(DEFAULT_SECRET)
    }

    /// Checks the credential presented with a request.
    ///
    /// `None` means the header was absent (or not valid UTF-8).
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredential`] if `presented` is `None`
    /// - [`AuthError::InvalidCredential`] if it does not match
    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let presented = presented.ok_or(AuthError::MissingCredential)?;
        if self.matches(presented) {
            Ok(())
        } else {
            tracing::debug!("shared secret mismatch");
            Err(AuthError::InvalidCredential)
        }
    }

    /// Compares fixed-size digests with no data-dependent branch.
    fn matches(&self, presented: &str) -> bool {
        let expected = sha256(self.secret.as_bytes());
        let presented = sha256(presented.as_bytes());
        expected.iter().zip(presented.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

impl Default for SharedSecret {
    fn default() -> Self {
        Self { secret: Zeroizing::new(DEFAULT_SECRET.to_owned()) }
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret").field("secret", &"[REDACTED]").finish()
    }
}

fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
