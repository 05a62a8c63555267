//! Ordered, expiring key-value storage underneath the loggate log store.
//!
//! The log store only needs a handful of primitives: write a value with a
//! time-to-live, read one key, scan a key prefix in byte order, and clear a
//! range. [`StorageBackend`] names exactly those. Two engines implement it:
//! [`MemoryBackend`] here and `SledBackend` in `loggate-storage-sled`.
//!
//! ```text
//!   loggate-server   HTTP routes, shared-secret auth, probes
//!         │
//!   loggate-log      LogStore: ids, entry encoding, retention
//!         │
//!   loggate-storage  StorageBackend ── MemoryBackend
//!                          └──────────── SledBackend (loggate-storage-sled)
//! ```
//!
//! # Writing another engine
//!
//! Implement [`StorageBackend`], map engine failures onto [`StorageError`],
//! and generate the shared contract tests in the engine's `tests/` directory:
//!
//! ```ignore
//! loggate_storage::backend_contract_tests!((MyBackend::new(), ()));
//! ```
//!
//! The `testutil` feature exposes those tests and the fixtures in
//! [`testutil`].

#![deny(unsafe_code)]

pub mod backend;
pub mod clock;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod conformance;
pub mod error;
pub mod health;
pub mod memory;
pub mod size_limits;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

pub use backend::StorageBackend;
pub use clock::{Clock, MockClock, SystemClock, unix_millis};
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use health::{HealthProbe, HealthState, HealthStatus};
pub use memory::MemoryBackend;
pub use size_limits::SizeLimits;
pub use types::{KeyValue, is_empty_range, prefix_range, range_as_slices};
