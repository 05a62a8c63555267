//! Error types for the sled storage backend.
//!
//! [`SledStorageError`] covers failures specific to this crate and maps onto
//! the generic [`StorageError`] at the trait boundary.

use loggate_storage::{ConfigError, StorageError};
use thiserror::Error;

/// Result type alias for sled backend operations.
pub type Result<T> = std::result::Result<T, SledStorageError>;

/// Errors specific to the sled storage backend.
#[derive(Debug, Error)]
pub enum SledStorageError {
    /// Error reported by the sled engine.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Invalid backend configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A stored value is not a valid envelope.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<SledStorageError> for StorageError {
    fn from(err: SledStorageError) -> Self {
        match err {
            SledStorageError::Sled(source) => sled_error_to_storage_error(source),
            SledStorageError::Config(source) => {
                StorageError::internal_with_source(format!("config: {source}"), source)
            },
            SledStorageError::Envelope(message) => StorageError::serialization(message),
            SledStorageError::Join(source) => {
                StorageError::internal_with_source("blocking task failed", source)
            },
        }
    }
}

/// Converts a sled error to a storage error, keeping it as the source.
fn sled_error_to_storage_error(err: sled::Error) -> StorageError {
    let message = err.to_string();
    if let sled::Error::CollectionNotFound(name) = &err {
        return StorageError::not_found(String::from_utf8_lossy(name).into_owned());
    }
    match err {
        sled::Error::Io(_) => StorageError::connection_with_source(message, err),
        sled::Error::Corruption { .. } | sled::Error::ReportableBug(_) => {
            tracing::error!(error = %message, "sled integrity failure");
            StorageError::internal_with_source(message, err)
        },
        _ => StorageError::internal_with_source(message, err),
    }
}
