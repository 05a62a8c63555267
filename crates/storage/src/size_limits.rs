//! Ceilings on key and value length, checked before a write reaches an engine.

use crate::error::{ConfigError, StorageError, StorageResult};

/// Largest key and value, in bytes, a backend will store.
///
/// The gateway's keys are a short namespace plus a 26-character id, so the
/// key ceiling only trips on misuse. The value ceiling bounds one serialised
/// log entry.
///
/// ```
/// use loggate_storage::SizeLimits;
///
/// let limits = SizeLimits::new(64, 1024).unwrap();
/// assert!(limits.check(b"logs\x00id", &[0u8; 1024]).is_ok());
/// assert!(limits.check(b"logs\x00id", &[0u8; 1025]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    key: usize,
    value: usize,
}

impl SizeLimits {
    /// 512 byte keys, 512 KiB values.
    pub const DEFAULT: Self = Self { key: 512, value: 512 * 1024 };

    /// Builds limits from explicit ceilings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either ceiling is zero.
    pub fn new(max_key: usize, max_value: usize) -> Result<Self, ConfigError> {
        for (field, limit) in [("max_key_size", max_key), ("max_value_size", max_value)] {
            if limit == 0 {
                return Err(ConfigError::BelowMinimum {
                    field,
                    min: "1".to_owned(),
                    value: limit.to_string(),
                });
            }
        }
        Ok(Self { key: max_key, value: max_value })
    }

    /// Largest accepted key.
    #[must_use]
    pub const fn max_key(&self) -> usize {
        self.key
    }

    /// Largest accepted value.
    #[must_use]
    pub const fn max_value(&self) -> usize {
        self.value
    }

    /// Rejects a write whose key or value is over its ceiling. The key is
    /// checked first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SizeLimitExceeded`] naming the offending part.
    pub fn check(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if key.len() > self.key {
            return Err(StorageError::size_limit_exceeded("key", key.len(), self.key));
        }
        if value.len() > self.value {
            return Err(StorageError::size_limit_exceeded("value", value.len(), self.value));
        }
        Ok(())
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::both_at_ceiling(8, 16, None)]
    #[case::empty_write(0, 0, None)]
    #[case::key_over(9, 16, Some("key"))]
    #[case::value_over(8, 17, Some("value"))]
    #[case::key_reported_before_value(9, 17, Some("key"))]
    fn check_names_the_oversized_part(
        #[case] key_len: usize,
        #[case] value_len: usize,
        #[case] rejected: Option<&str>,
    ) {
        let limits = SizeLimits::new(8, 16).unwrap();

        let result = limits.check(&vec![b'k'; key_len], &vec![b'v'; value_len]);

        match (result, rejected) {
            (Ok(()), None) => {},
            (Err(StorageError::SizeLimitExceeded { kind, .. }), Some(expected)) => {
                assert_eq!(kind, expected);
            },
            (other, expected) => panic!("expected rejection {expected:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_ceiling_is_a_config_error() {
        let err = SizeLimits::new(512, 0).unwrap_err();
        assert_eq!(err.to_string(), "max_value_size must be at least 1, got 0");
    }

    #[test]
    fn test_default_admits_a_full_size_entry() {
        let limits = SizeLimits::default();
        assert_eq!(limits.max_value(), 512 * 1024);
        assert!(limits.check(&[0u8; 31], &vec![0u8; limits.max_value()]).is_ok());
    }
}
