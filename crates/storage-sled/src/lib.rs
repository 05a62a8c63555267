//! Durable [`StorageBackend`](loggate_storage::StorageBackend) built on the
//! [`sled`] embedded database.
//!
//! # Features
//!
//! - **Ordered**: keys are stored raw, so sled's byte order is the range order
//! - **Expiring**: values carry an expiry header; reads hide expired values and
//!   a background sweep deletes them
//! - **Acknowledged durability**: with `flush_on_write`, `set` and
//!   `set_with_ttl` return only after sled has flushed
//! - **Non-blocking scans**: range reads and purges run on tokio's blocking pool
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use loggate_storage::StorageBackend;
//! use loggate_storage_sled::{SledBackend, SledBackendConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SledBackendConfig::builder().path("./data/kv").build()?;
//!     let backend = SledBackend::open(&config)?;
//!
//!     backend.set_with_ttl(b"logs\x00a".to_vec(), b"{}".to_vec(), Duration::from_secs(60)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Mapping
//!
//! | sled | `StorageError` |
//! |------|----------------|
//! | `Io` | `Connection` |
//! | `CollectionNotFound` | `NotFound` |
//! | `Corruption`, `ReportableBug`, `Unsupported` | `Internal` |
//! | bad value envelope | `Serialization` |

#![deny(unsafe_code)]

mod backend;
mod config;
pub mod envelope;
mod error;

pub use backend::SledBackend;
pub use config::{DEFAULT_TREE, SledBackendConfig};
pub use error::{Result, SledStorageError};
