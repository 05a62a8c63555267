//! The engine the gateway runs on, chosen at startup.

use std::{ops::RangeBounds, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use loggate_storage::{
    HealthProbe, HealthStatus, KeyValue, MemoryBackend, SizeLimits, StorageBackend, StorageError,
    StorageResult,
};
use loggate_storage_sled::SledBackend;

use crate::config::StorageSettings;

/// Either storage engine behind one concrete type.
///
/// [`StorageBackend`]'s range methods are generic, so `dyn StorageBackend`
/// is not possible and `LogStore<Backend>` dispatches through this enum.
#[derive(Clone)]
pub enum Backend {
    /// `--in-memory`: nothing survives a restart.
    Memory(MemoryBackend),
    /// Durable store in the `--kv` directory.
    Sled(SledBackend),
}

/// Forwards a call to whichever engine `self` holds.
macro_rules! on_engine {
    ($self:ident, $engine:ident => $call:expr) => {
        match $self {
            Backend::Memory($engine) => $call,
            Backend::Sled($engine) => $call,
        }
    };
}

impl Backend {
    /// Opens the engine `settings` names, with the default entry size
    /// ceilings applied.
    ///
    /// # Errors
    ///
    /// Returns the sled failure as a [`StorageError`] when the data
    /// directory cannot be opened or is locked by another process.
    pub fn open(settings: &StorageSettings) -> StorageResult<Self> {
        let limits = SizeLimits::DEFAULT;
        Ok(match settings {
            StorageSettings::InMemory => {
                Self::Memory(MemoryBackend::new().with_size_limits(limits))
            },
            StorageSettings::Sled(config) => {
                let sled = SledBackend::open(config).map_err(StorageError::from)?;
                Self::Sled(sled.with_size_limits(limits))
            },
        })
    }

    /// An unlimited in-memory engine, for tests.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryBackend::new())
    }

    /// Short engine name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sled(_) => "sled",
        }
    }

    /// Stops the engine's expiry sweep.
    pub fn shutdown(&self) {
        on_engine!(self, engine => engine.shutdown());
    }
}

#[async_trait]
impl StorageBackend for Backend {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        on_engine!(self, engine => engine.get(key).await)
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        on_engine!(self, engine => engine.set(key, value).await)
    }

    async fn set_with_ttl(&self, key: Vec<u8>, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        on_engine!(self, engine => engine.set_with_ttl(key, value, ttl).await)
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        on_engine!(self, engine => engine.delete(key).await)
    }

    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        on_engine!(self, engine => engine.get_range(range).await)
    }

    async fn clear_range<R>(&self, range: R) -> StorageResult<()>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        on_engine!(self, engine => engine.clear_range(range).await)
    }

    async fn health_check(&self, probe: HealthProbe) -> StorageResult<HealthStatus> {
        on_engine!(self, engine => engine.health_check(probe).await)
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory(_) => f.write_str("Backend::Memory"),
            Self::Sled(sled) => write!(f, "Backend::Sled({sled:?})"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use loggate_storage::prefix_range;
    use loggate_storage_sled::SledBackendConfig;

    use super::*;

    #[tokio::test]
    async fn should_open_memory_engine() {
        let backend = Backend::open(&StorageSettings::InMemory).unwrap();

        backend.set(b"k".to_vec(), b"v".to_vec()).await.unwrap();

        assert_eq!(backend.kind(), "memory");
        assert_eq!(backend.get(b"k").await.unwrap(), Some(Bytes::from("v")));
        assert_eq!(format!("{backend:?}"), "Backend::Memory");
    }

    #[tokio::test]
    async fn should_open_sled_engine_in_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = SledBackendConfig::builder().path(dir.path()).build().unwrap();
        let backend = Backend::open(&StorageSettings::Sled(config)).unwrap();

        backend
            .set_with_ttl(b"logs\x00a".to_vec(), b"{}".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(backend.kind(), "sled");
        assert_eq!(backend.get_range(prefix_range(b"logs\x00")).await.unwrap().len(), 1);
        let status = backend.health_check(HealthProbe::Readiness).await.unwrap();
        assert!(status.is_serving(), "{status}");
        backend.shutdown();
    }

    #[tokio::test]
    async fn should_refuse_entries_over_default_ceiling() {
        let backend = Backend::open(&StorageSettings::InMemory).unwrap();
        let oversized = vec![0u8; SizeLimits::DEFAULT.max_value() + 1];

        let err = backend.set(b"k".to_vec(), oversized).await.unwrap_err();

        assert!(matches!(err, StorageError::SizeLimitExceeded { kind: "value", .. }));
    }
}
