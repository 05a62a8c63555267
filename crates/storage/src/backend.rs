//! The [`StorageBackend`] trait.

use std::{ops::RangeBounds, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::StorageResult,
    health::{HealthProbe, HealthStatus},
    types::KeyValue,
};

/// Ordered byte-keyed store where any value may carry a time-to-live.
///
/// Keys compare as raw bytes. Expired values are invisible to every read
/// from the moment their deadline passes, whether or not the engine has
/// physically removed them yet. Engines know nothing about log entries;
/// namespacing and encoding happen in `loggate-log`.
///
/// The range methods are generic, so the trait is not object safe. Callers
/// that pick an engine at runtime wrap the engines in an enum.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads one live value. Missing and expired keys both give `Ok(None)`.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Writes a value that never expires, replacing any previous value and
    /// deadline.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Writes a value that expires `ttl` after the engine's current time,
    /// replacing any previous value and deadline.
    ///
    /// `Ok(())` is the acknowledgement the gateway answers 201 on, so it must
    /// only be returned once the engine holds the value as durably as it
    /// ever will.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Internal`](crate::StorageError::Internal) when the
    ///   deadline does not fit the clock.
    /// - [`StorageError::SizeLimitExceeded`](crate::StorageError::SizeLimitExceeded)
    ///   when the key or value is over the engine's limits.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set_with_ttl(&self, key: Vec<u8>, value: Vec<u8>, ttl: Duration) -> StorageResult<()>;

    /// Removes a key. Removing a missing key succeeds.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Collects every live pair in `range`, ascending by key. Inverted or
    /// empty ranges give an empty vector.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send;

    /// Removes every key in `range`, live or expired.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn clear_range<R>(&self, range: R) -> StorageResult<()>
    where
        R: RangeBounds<Vec<u8>> + Send;

    /// Reports whether the engine can serve `probe`.
    #[must_use = "health check results indicate backend availability and must be inspected"]
    async fn health_check(&self, probe: HealthProbe) -> StorageResult<HealthStatus>;
}
