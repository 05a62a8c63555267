//! Configuration for the sled storage backend.

use std::{path::PathBuf, time::Duration};

use loggate_storage::ConfigError;
use serde::{Deserialize, Serialize};

/// Default tree name holding gateway data.
pub const DEFAULT_TREE: &str = "loggate";

/// Default interval between expiry sweeps (60 seconds).
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default page cache capacity (64 MiB).
const DEFAULT_CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

/// Configuration for [`SledBackend`](crate::SledBackend).
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use loggate_storage_sled::SledBackendConfig;
///
/// let config = SledBackendConfig::builder()
///     .path("/var/lib/loggate")
///     .sweep_interval(Duration::from_secs(30))
///     .build()?;
/// assert!(config.flush_on_write());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// From a configuration file:
///
/// ```text
/// path = "/var/lib/loggate"
/// sweep_interval = "5m"
/// flush_on_write = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SledBackendConfig {
    /// Directory holding the sled database.
    pub(crate) path: PathBuf,

    /// Tree (keyspace) inside the database.
    #[serde(default = "default_tree")]
    pub(crate) tree: String,

    /// Flush to disk before acknowledging each write.
    #[serde(default = "default_flush_on_write")]
    pub(crate) flush_on_write: bool,

    /// Interval between background expiry sweeps.
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub(crate) sweep_interval: Duration,

    /// sled page cache capacity in bytes.
    #[serde(default = "default_cache_capacity")]
    pub(crate) cache_capacity: u64,

    /// Delete the database when the backend is dropped (tests).
    #[serde(default)]
    pub(crate) temporary: bool,
}

fn default_tree() -> String {
    DEFAULT_TREE.to_owned()
}

fn default_flush_on_write() -> bool {
    true
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

fn default_cache_capacity() -> u64 {
    DEFAULT_CACHE_CAPACITY
}

#[bon::bon]
impl SledBackendConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Empty`] if `path` or `tree` is empty
    /// - [`ConfigError::BelowMinimum`] if `sweep_interval` is zero
    #[builder]
    pub fn new(
        #[builder(into)] path: PathBuf,
        #[builder(into, default = default_tree())] tree: String,
        #[builder(default = true)] flush_on_write: bool,
        #[builder(default = DEFAULT_SWEEP_INTERVAL)] sweep_interval: Duration,
        #[builder(default = DEFAULT_CACHE_CAPACITY)] cache_capacity: u64,
        #[builder(default)] temporary: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self { path, tree, flush_on_write, sweep_interval, cache_capacity, temporary };
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that serde deserialisation cannot express.
    ///
    /// # Errors
    ///
    /// Same conditions as [`new`](Self::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Empty { field: "path" });
        }
        if self.tree.is_empty() {
            return Err(ConfigError::Empty { field: "tree" });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "sweep_interval",
                min: "1ms".into(),
                value: "0s".into(),
            });
        }
        Ok(())
    }

    /// Returns the database directory.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Returns the tree name.
    #[must_use]
    pub fn tree(&self) -> &str {
        &self.tree
    }

    /// Returns whether writes are flushed before acknowledgement.
    #[must_use]
    pub fn flush_on_write(&self) -> bool {
        self.flush_on_write
    }

    /// Returns the expiry sweep interval.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Returns the page cache capacity in bytes.
    #[must_use]
    pub fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }

    /// Builds the sled engine configuration.
    pub(crate) fn to_sled_config(&self) -> sled::Config {
        sled::Config::new()
            .path(&self.path)
            .cache_capacity(self.cache_capacity)
            .temporary(self.temporary)
    }
}
