//! [`SledBackend`]: the durable [`StorageBackend`].

use std::{
    ops::{Bound, RangeBounds},
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use loggate_storage::{
    Clock, HealthProbe, HealthStatus, KeyValue, SizeLimits, StorageBackend, StorageError,
    StorageResult, SystemClock, is_empty_range, unix_millis,
};
use tokio::{select, sync::watch, time::sleep};

use crate::{
    config::SledBackendConfig,
    envelope::{self, Envelope},
    error::{Result, SledStorageError},
};

/// A readiness probe slower than this reports `Degraded`.
const SLOW_PROBE: Duration = Duration::from_secs(1);

type OwnedRange = (Bound<Vec<u8>>, Bound<Vec<u8>>);

/// Stops the sweep task when the last backend clone is dropped.
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Durable ordered key-value backend on top of a sled tree.
///
/// Values are framed with an expiry header (see [`envelope`](crate::envelope));
/// reads hide expired values and a background task deletes them every
/// [`sweep_interval`](SledBackendConfig::sweep_interval).
///
/// # Durability
///
/// With `flush_on_write` (the default) a write is acknowledged only after
/// sled has flushed it, so an acknowledged append survives a crash.
///
/// # Blocking
///
/// sled's API is synchronous. Every operation, including the flush, runs on
/// tokio's blocking pool so request tasks never stall a worker thread.
///
/// # Cloning
///
/// Clones share the database handle, the clock and the sweep task.
#[derive(Clone)]
pub struct SledBackend {
    db: sled::Db,
    tree: sled::Tree,
    clock: Arc<dyn Clock>,
    flush_on_write: bool,
    limits: Option<SizeLimits>,
    shutdown_guard: Arc<ShutdownGuard>,
}

impl std::fmt::Debug for SledBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledBackend")
            .field("tree", &String::from_utf8_lossy(&self.tree.name()))
            .field("flush_on_write", &self.flush_on_write)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl SledBackend {
    /// Opens (or creates) the database described by `config`.
    ///
    /// Must be called from within a tokio runtime; the expiry sweep is
    /// spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or sled cannot open
    /// the database (for example because another process holds its lock).
    pub fn open(config: &SledBackendConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`open`](Self::open), with expiry measured by `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_clock(config: &SledBackendConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let db = config.to_sled_config().open()?;
        let tree = db.open_tree(config.tree())?;
        tracing::info!(
            path = %config.path().display(),
            tree = config.tree(),
            entries = tree.len(),
            "opened sled backend"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let backend = Self {
            db,
            tree,
            clock,
            flush_on_write: config.flush_on_write(),
            limits: None,
            shutdown_guard: Arc::new(ShutdownGuard { shutdown_tx }),
        };

        let sweeper = backend.clone_for_sweep();
        let interval = config.sweep_interval();
        tokio::spawn(async move {
            sweeper.run_sweeps(interval, shutdown_rx).await;
        });

        Ok(backend)
    }

    /// Enforces `limits` on every subsequent write.
    #[must_use]
    pub fn with_size_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Explicitly stops the background sweep.
    pub fn shutdown(&self) {
        let _ = self.shutdown_guard.shutdown_tx.send(());
    }

    /// Flushes all dirty pages to disk.
    ///
    /// # Errors
    ///
    /// Returns a storage error if sled fails to flush.
    pub async fn flush(&self) -> StorageResult<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.flush())
            .await
            .map_err(SledStorageError::from)?
            .map_err(SledStorageError::from)?;
        Ok(())
    }

    /// Deletes every expired value now, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan fails or a value is not a valid
    /// envelope.
    pub async fn purge_expired(&self) -> StorageResult<usize> {
        let now_ms = self.now_ms();
        let removed = self.on_tree(move |tree| purge_tree(tree, now_ms)).await?;
        if removed > 0 {
            tracing::debug!(removed, "purged expired values");
        }
        Ok(removed)
    }

    /// A clone whose drop does not count towards stopping the sweep.
    fn clone_for_sweep(&self) -> SweepHandle {
        SweepHandle { tree: self.tree.clone(), clock: Arc::clone(&self.clock) }
    }

    fn now_ms(&self) -> u64 {
        unix_millis(self.clock.now())
    }

    fn check_sizes(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.limits.as_ref().map_or(Ok(()), |limits| limits.check(key, value))
    }

    /// Runs `op` against the tree on the blocking pool.
    async fn on_tree<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&sled::Tree) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tree = self.tree.clone();
        let out = tokio::task::spawn_blocking(move || op(&tree))
            .await
            .map_err(SledStorageError::from)??;
        Ok(out)
    }

    /// Runs a mutation and, with `flush_on_write`, flushes before returning.
    ///
    /// The flush is sled's synchronous `flush`, issued from the same blocking
    /// task as the mutation. Concurrent writers each block one pool thread
    /// while sled serialises their flushes.
    async fn mutate<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&sled::Tree) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let flush = self.flush_on_write;
        self.on_tree(move |tree| {
            let out = op(tree)?;
            if flush {
                tree.flush()?;
            }
            Ok(out)
        })
        .await
    }

    async fn write(
        &self,
        key: Vec<u8>,
        value: &[u8],
        expires_at_ms: Option<u64>,
    ) -> StorageResult<()> {
        self.check_sizes(&key, value)?;
        let framed = envelope::encode(expires_at_ms, value);
        self.mutate(move |tree| {
            tree.insert(key, framed)?;
            Ok(())
        })
        .await
    }
}

/// State the sweep task needs; holds no shutdown guard.
struct SweepHandle {
    tree: sled::Tree,
    clock: Arc<dyn Clock>,
}

impl SweepHandle {
    async fn run_sweeps(self, interval: Duration, mut shutdown_rx: watch::Receiver<()>) {
        loop {
            select! {
                _ = sleep(interval) => {}
                _ = shutdown_rx.changed() => {
                    return;
                }
            }

            let tree = self.tree.clone();
            let now_ms = unix_millis(self.clock.now());
            match tokio::task::spawn_blocking(move || purge_tree(&tree, now_ms)).await {
                Ok(Ok(0)) => {},
                Ok(Ok(removed)) => tracing::debug!(removed, "sweep removed expired values"),
                Ok(Err(e)) => tracing::warn!(error = %e, "expiry sweep failed"),
                Err(e) => tracing::warn!(error = %e, "expiry sweep task panicked"),
            }
        }
    }
}

/// Removes expired values. A value rewritten since it was read is kept.
fn purge_tree(tree: &sled::Tree, now_ms: u64) -> Result<usize> {
    let mut removed = 0;
    for item in tree.iter() {
        let (key, value) = item?;
        if !Envelope::decode(&value)?.is_expired_at(now_ms) {
            continue;
        }
        if tree.compare_and_swap(&key, Some(&value), None::<&[u8]>)?.is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Collects live entries in `range`, decoding each envelope.
fn scan_tree(tree: &sled::Tree, range: OwnedRange, now_ms: u64) -> Result<Vec<KeyValue>> {
    let mut out = Vec::new();
    for item in tree.range(range) {
        let (key, value) = item?;
        let envelope = Envelope::decode(&value)?;
        if envelope.is_expired_at(now_ms) {
            continue;
        }
        let payload = Bytes::copy_from_slice(envelope.payload);
        out.push(KeyValue::new(Bytes::copy_from_slice(&key), payload));
    }
    Ok(out)
}

fn clear_tree(tree: &sled::Tree, range: OwnedRange) -> Result<usize> {
    let mut removed = 0;
    for item in tree.range(range) {
        let (key, _) = item?;
        tree.remove(key)?;
        removed += 1;
    }
    Ok(removed)
}

fn to_owned_range<R: RangeBounds<Vec<u8>>>(range: &R) -> OwnedRange {
    (range.start_bound().cloned(), range.end_bound().cloned())
}

#[async_trait]
impl StorageBackend for SledBackend {
    #[tracing::instrument(skip_all, fields(key_len = key.len()))]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        let key = key.to_vec();
        let now_ms = self.now_ms();
        self.on_tree(move |tree| {
            let Some(raw) = tree.get(&key)? else {
                return Ok(None);
            };
            let envelope = Envelope::decode(&raw)?;
            if envelope.is_expired_at(now_ms) {
                return Ok(None);
            }
            Ok(Some(Bytes::copy_from_slice(envelope.payload)))
        })
        .await
    }

    #[tracing::instrument(skip_all, fields(key_len = key.len(), value_len = value.len()))]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.write(key, &value, None).await
    }

    #[tracing::instrument(skip_all, fields(key_len = key.len(), ttl_secs = ttl.as_secs()))]
    async fn set_with_ttl(&self, key: Vec<u8>, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        let deadline = self
            .clock
            .now()
            .checked_add(ttl)
            .ok_or_else(|| StorageError::internal(format!("ttl of {ttl:?} overflows the clock")))?;
        self.write(key, &value, Some(unix_millis(deadline))).await
    }

    #[tracing::instrument(skip_all, fields(key_len = key.len()))]
    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let key = key.to_vec();
        self.mutate(move |tree| {
            tree.remove(key)?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip_all)]
    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        if is_empty_range(&range) {
            return Ok(Vec::new());
        }
        let owned = to_owned_range(&range);
        let now_ms = self.now_ms();
        let results = self.on_tree(move |tree| scan_tree(tree, owned, now_ms)).await?;
        tracing::trace!(count = results.len(), "range scanned");
        Ok(results)
    }

    #[tracing::instrument(skip_all)]
    async fn clear_range<R>(&self, range: R) -> StorageResult<()>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        if is_empty_range(&range) {
            return Ok(());
        }
        let owned = to_owned_range(&range);
        let removed = self.mutate(move |tree| clear_tree(tree, owned)).await?;
        tracing::trace!(removed, "range cleared");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(probe = %probe))]
    async fn health_check(&self, probe: HealthProbe) -> StorageResult<HealthStatus> {
        let started = Instant::now();
        if probe == HealthProbe::Liveness {
            return Ok(HealthStatus::healthy("sled", started.elapsed()));
        }

        let tree = self.tree.clone();
        let db = self.db.clone();
        let read = tokio::task::spawn_blocking(move || -> Result<u64> {
            tree.first()?;
            Ok(db.size_on_disk()?)
        })
        .await;

        let elapsed = started.elapsed();
        let status = match read {
            Ok(Ok(size)) if elapsed > SLOW_PROBE => {
                HealthStatus::degraded("sled", elapsed, "slow disk read")
                    .with_detail(format!("size_on_disk={size}"))
            },
            Ok(Ok(size)) => {
                HealthStatus::healthy("sled", elapsed).with_detail(format!("size_on_disk={size}"))
            },
            Ok(Err(e)) => HealthStatus::unhealthy("sled", elapsed, e.to_string()),
            Err(e) => HealthStatus::unhealthy("sled", elapsed, format!("health task failed: {e}")),
        };
        Ok(status)
    }
}
