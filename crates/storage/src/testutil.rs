//! Fixtures shared by the workspace's tests. Enabled by the `testutil` feature.

use std::sync::Arc;

pub use crate::conformance::entry_key;
use crate::{MemoryBackend, MockClock, StorageBackend, prefix_range};

/// A memory backend on a hand-driven clock, with its sweep stopped so only
/// reads decide what has expired.
pub fn mock_clock_backend() -> (MemoryBackend, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new());
    let backend = MemoryBackend::with_clock(clock.clone());
    backend.shutdown();
    (backend, clock)
}

/// Keys under `prefix` that a scan currently returns, in scan order.
pub async fn live_keys<B: StorageBackend>(backend: &B, prefix: &[u8]) -> Vec<Vec<u8>> {
    backend
        .get_range(prefix_range(prefix))
        .await
        .expect("prefix scan")
        .into_iter()
        .map(|kv| kv.key.to_vec())
        .collect()
}
