//! Append-and-list adapter over an ordered key-value backend.

use std::time::Duration;

use loggate_storage::{KeyValue, StorageBackend, StorageError, prefix_range};
use serde::{Deserialize, Serialize};

use crate::{
    entry::LogEntry,
    error::LogResult,
    id::IdGenerator,
    key::{EntryKey, NAMESPACE_PREFIX},
};

/// How long an appended entry stays visible: 30 days.
pub const LOG_RETENTION: Duration = Duration::from_secs(30 * 86_400);

/// An entry together with the key it was stored under.
///
/// Serialises as `{"key": ["logs", "<id>"], "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The storage key.
    pub key: EntryKey,
    /// The stored entry.
    pub value: LogEntry,
}

/// Log store over any [`StorageBackend`].
///
/// Owns the [`IdGenerator`] used for keys, so one store instance gives one
/// strictly increasing key sequence. Share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use loggate_log::{LogEntry, LogStore};
/// use loggate_storage::MemoryBackend;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = LogStore::new(MemoryBackend::new());
///
/// store.append(&LogEntry::new("c1", "u1", "hello")?).await?;
/// let entries = store.list_all().await?;
/// assert_eq!(entries[0].value.content(), "hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct LogStore<B> {
    backend: B,
    ids: IdGenerator,
}

impl<B: StorageBackend> LogStore<B> {
    /// Creates a store writing to `backend` with a system-clock generator.
    pub fn new(backend: B) -> Self {
        Self::with_generator(backend, IdGenerator::new())
    }

    /// Creates a store using the given id generator.
    pub fn with_generator(backend: B, ids: IdGenerator) -> Self {
        Self { backend, ids }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the time-to-live applied to every appended entry.
    #[must_use]
    pub fn retention(&self) -> Duration {
        LOG_RETENTION
    }

    /// Stores `entry` under a fresh key that expires after [`LOG_RETENTION`].
    ///
    /// Every call creates a new entry, even for identical content. The write
    /// is complete once the backend acknowledges it; nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`LogError::Generator`](crate::LogError::Generator) if no id can be issued
    /// - [`LogError::Storage`](crate::LogError::Storage) with the backend's error, unchanged
    #[tracing::instrument(skip_all, fields(channel = %entry.channel()))]
    pub async fn append(&self, entry: &LogEntry) -> LogResult<EntryKey> {
        let value = entry
            .to_json()
            .map_err(|err| StorageError::serialization_with_source("encode log entry", err))?;
        let key = EntryKey::new(self.ids.next()?);

        self.backend.set_with_ttl(key.to_bytes(), value, LOG_RETENTION).await?;

        tracing::debug!(key = %key, "log entry appended");
        Ok(key)
    }

    /// Returns every live entry in ascending key order, which is creation
    /// order.
    ///
    /// The whole namespace is read in one range scan and returned in memory;
    /// there is no pagination, so response size grows with the log.
    ///
    /// # Errors
    ///
    /// - [`LogError::Storage`](crate::LogError::Storage) with the backend's error, unchanged
    /// - [`LogError::Storage`](crate::LogError::Storage) wrapping
    ///   [`StorageError::Serialization`] if a key or value in the namespace does not decode
    #[tracing::instrument(skip_all)]
    pub async fn list_all(&self) -> LogResult<Vec<StoredEntry>> {
        let pairs = self.backend.get_range(prefix_range(NAMESPACE_PREFIX)).await?;
        let entries = pairs.iter().map(decode).collect::<Result<Vec<_>, _>>()?;

        tracing::trace!(count = entries.len(), "log entries listed");
        Ok(entries)
    }
}

fn decode(pair: &KeyValue) -> Result<StoredEntry, StorageError> {
    let key = EntryKey::from_bytes(&pair.key).map_err(|err| {
        StorageError::serialization_with_source(
            format!("undecodable log key {}", String::from_utf8_lossy(&pair.key)),
            err,
        )
    })?;
    let value = serde_json::from_slice(&pair.value).map_err(|err| {
        StorageError::serialization_with_source(format!("undecodable log entry at {key}"), err)
    })?;
    Ok(StoredEntry { key, value })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use loggate_storage::{MemoryBackend, MockClock};

    use super::*;
    use crate::error::LogError;

    fn entry(content: &str) -> LogEntry {
        LogEntry::new("c1", "u1", content).unwrap()
    }

    #[tokio::test]
    async fn append_writes_under_namespace_with_retention() {
        let clock = Arc::new(MockClock::at_unix_millis(1_700_000_000_000));
        let backend = MemoryBackend::with_clock(clock.clone());
        let ids = IdGenerator::with_clock(clock.clone());
        let store = LogStore::with_generator(backend.clone(), ids);

        let key = store.append(&entry("hello")).await.unwrap();

        let raw = backend.get(&key.to_bytes()).await.unwrap().expect("value stored");
        assert_eq!(&raw[..], br#"{"channel":"c1","user":"u1","content":"hello"}"#);
        assert_eq!(key.id().timestamp_ms(), 1_700_000_000_000);

        clock.advance(LOG_RETENTION);
        assert!(backend.get(&key.to_bytes()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_all_ignores_neighbouring_namespaces() {
        let backend = MemoryBackend::new();
        backend.set(b"log".to_vec(), b"x".to_vec()).await.unwrap();
        backend.set(b"logs".to_vec(), b"x".to_vec()).await.unwrap();
        backend.set(b"logs\x01z".to_vec(), b"x".to_vec()).await.unwrap();
        backend.set(b"logsarchive".to_vec(), b"x".to_vec()).await.unwrap();
        let store = LogStore::new(backend);

        store.append(&entry("only")).await.unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].value.content(), "only");
    }

    #[tokio::test]
    async fn undecodable_value_is_a_serialization_error() {
        let backend = MemoryBackend::new();
        let key = EntryKey::new(crate::EntryId::from_u128(7));
        backend.set(key.to_bytes(), b"not json".to_vec()).await.unwrap();
        let store = LogStore::new(backend);

        let err = store.list_all().await.unwrap_err();
        let LogError::Storage(StorageError::Serialization { ref message, .. }) = err else {
            panic!("expected serialization error, got {err:?}");
        };
        assert!(message.contains("logs/"), "message should name the key: {message}");
    }

    #[tokio::test]
    async fn undecodable_key_is_a_serialization_error() {
        let backend = MemoryBackend::new();
        let value = br#"{"channel":"c","user":"u","content":""}"#.to_vec();
        backend.set(b"logs\x00bogus".to_vec(), value).await.unwrap();
        let store = LogStore::new(backend);

        let err = store.list_all().await.unwrap_err();
        assert!(
            matches!(err, LogError::Storage(StorageError::Serialization { .. })),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn retention_is_thirty_days() {
        let store = LogStore::new(MemoryBackend::new());
        assert_eq!(store.retention(), Duration::from_secs(2_592_000));
    }
}
