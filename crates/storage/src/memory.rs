//! [`MemoryBackend`]: the in-process [`StorageBackend`] behind `--in-memory`
//! and most tests.
//!
//! Every entry lives in one ordered map under a [`parking_lot::RwLock`], and
//! each slot carries its own deadline, so visibility is decided from the
//! slot alone. Nothing survives a restart.
//!
//! ```
//! use std::time::Duration;
//!
//! use loggate_storage::{MemoryBackend, StorageBackend, prefix_range};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let backend = MemoryBackend::new();
//! backend.set_with_ttl(b"logs\x00a".to_vec(), b"{}".to_vec(), Duration::from_secs(60)).await.unwrap();
//!
//! let live = backend.get_range(prefix_range(b"logs\x00")).await.unwrap();
//! assert_eq!(live.len(), 1);
//! # });
//! ```

use std::{
    collections::BTreeMap,
    ops::RangeBounds,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::{
    backend::StorageBackend,
    clock::{Clock, SystemClock},
    error::{StorageError, StorageResult},
    health::{HealthProbe, HealthStatus},
    size_limits::SizeLimits,
    types::{KeyValue, is_empty_range, range_as_slices},
};

/// How often the sweep task drops expired slots.
const SWEEP_EVERY: Duration = Duration::from_secs(1);

type Map = BTreeMap<Vec<u8>, Slot>;

#[derive(Debug, Clone)]
struct Slot {
    value: Bytes,
    expires_at: Option<SystemTime>,
}

impl Slot {
    fn live_at(&self, now: SystemTime) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// Signals the sweep task on drop, so it ends with the last clone.
struct StopSweep(watch::Sender<bool>);

impl Drop for StopSweep {
    fn drop(&mut self) {
        let _ = self.0.send(true);
    }
}

/// Ordered in-memory backend with per-entry expiry.
///
/// Clones share the map, the clock and the sweep task. The sweep holds only
/// the map, so it stops once every clone is dropped, or earlier on
/// [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct MemoryBackend {
    map: Arc<RwLock<Map>>,
    clock: Arc<dyn Clock>,
    limits: Option<SizeLimits>,
    stop: Arc<StopSweep>,
}

impl MemoryBackend {
    /// A backend on the system clock. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A backend whose deadlines come from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let map: Arc<RwLock<Map>> = Arc::default();
        tokio::spawn(sweep(Arc::clone(&map), Arc::clone(&clock), stop_rx));
        Self { map, clock, limits: None, stop: Arc::new(StopSweep(stop_tx)) }
    }

    /// Rejects writes over `limits` from now on.
    #[must_use]
    pub fn with_size_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Slots physically held, counting expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether no slots are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Drops every expired slot now and returns how many went.
    pub fn purge_expired(&self) -> usize {
        purge(&self.map, self.clock.now())
    }

    /// Stops the sweep task. Reads keep hiding expired slots.
    pub fn shutdown(&self) {
        let _ = self.stop.0.send(true);
    }

    fn store(&self, key: Vec<u8>, value: Vec<u8>, ttl: Option<Duration>) -> StorageResult<()> {
        if let Some(limits) = &self.limits {
            limits.check(&key, &value)?;
        }
        let expires_at = match ttl {
            Some(ttl) => Some(self.clock.now().checked_add(ttl).ok_or_else(|| {
                StorageError::internal(format!("ttl of {ttl:?} overflows the clock"))
            })?),
            None => None,
        };
        self.map.write().insert(key, Slot { value: Bytes::from(value), expires_at });
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn purge(map: &RwLock<Map>, now: SystemTime) -> usize {
    let mut map = map.write();
    let before = map.len();
    map.retain(|_, slot| slot.live_at(now));
    let removed = before - map.len();
    if removed > 0 {
        tracing::trace!(removed, "swept expired slots");
    }
    removed
}

async fn sweep(map: Arc<RwLock<Map>>, clock: Arc<dyn Clock>, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(SWEEP_EVERY);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                purge(&map, clock.now());
            },
            _ = stop.changed() => return,
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    #[tracing::instrument(skip_all, fields(key_len = key.len()))]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        let now = self.clock.now();
        let map = self.map.read();
        Ok(map.get(key).filter(|slot| slot.live_at(now)).map(|slot| slot.value.clone()))
    }

    #[tracing::instrument(skip_all, fields(key_len = key.len(), value_len = value.len()))]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.store(key, value, None)
    }

    #[tracing::instrument(skip_all, fields(key_len = key.len(), ttl_secs = ttl.as_secs()))]
    async fn set_with_ttl(&self, key: Vec<u8>, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        self.store(key, value, Some(ttl))
    }

    #[tracing::instrument(skip_all, fields(key_len = key.len()))]
    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.map.write().remove(key);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        if is_empty_range(&range) {
            return Ok(Vec::new());
        }
        let now = self.clock.now();
        let live: Vec<KeyValue> = self
            .map
            .read()
            .range::<[u8], _>(range_as_slices(&range))
            .filter(|(_, slot)| slot.live_at(now))
            .map(|(key, slot)| KeyValue::new(Bytes::copy_from_slice(key), slot.value.clone()))
            .collect();
        tracing::trace!(count = live.len(), "range scanned");
        Ok(live)
    }

    #[tracing::instrument(skip_all)]
    async fn clear_range<R>(&self, range: R) -> StorageResult<()>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        if is_empty_range(&range) {
            return Ok(());
        }
        let mut map = self.map.write();
        let doomed: Vec<Vec<u8>> =
            map.range::<[u8], _>(range_as_slices(&range)).map(|(key, _)| key.clone()).collect();
        for key in &doomed {
            map.remove(key);
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(probe = %probe))]
    async fn health_check(&self, probe: HealthProbe) -> StorageResult<HealthStatus> {
        let started = Instant::now();
        let entries = self.map.read().len();
        let status = HealthStatus::healthy("memory", started.elapsed());
        Ok(status.with_detail(format!("entries={entries}")))
    }
}
