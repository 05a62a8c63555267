//! Append-only log store for loggate.
//!
//! Entries are written under the `logs` namespace of an ordered key-value
//! backend with a fixed 30-day retention, and read back in creation order.
//!
//! - [`IdGenerator`] issues strictly increasing, lexically sortable
//!   [`EntryId`]s (ULID layout: 48-bit millisecond timestamp, 80 random bits).
//! - [`LogStore`] combines a generator with any
//!   [`StorageBackend`](loggate_storage::StorageBackend) and exposes
//!   [`append`](LogStore::append) and [`list_all`](LogStore::list_all).
//!
//! ```text
//!   LogEntry ──append──▶ IdGenerator::next ──▶ EntryKey "logs\0<id>"
//!                                                   │
//!                                                   ▼
//!                                   StorageBackend::set_with_ttl(30 days)
//!
//!   list_all ──▶ StorageBackend::get_range(prefix "logs\0") ──▶ Vec<StoredEntry>
//! ```
//!
//! The store performs no authentication, retries nothing and logs nothing
//! above debug level; errors go back to the caller as they occurred.

#![deny(unsafe_code)]

pub mod entry;
pub mod error;
pub mod id;
pub mod key;
pub mod store;

pub use entry::LogEntry;
pub use error::{GeneratorError, KeyError, LogError, LogResult, ParseIdError, ValidationError};
pub use id::{EntryId, IdGenerator};
pub use key::{EntryKey, NAMESPACE};
pub use store::{LOG_RETENTION, LogStore, StoredEntry};
