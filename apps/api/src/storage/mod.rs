//! Storage seams for the analysis pipeline and record lifecycle.
//!
//! The orchestrator and presenter never talk to S3 or Redis directly; they
//! receive a `BlobStore` and a `RecordStore` handle, so tests can substitute
//! in-memory fakes for both.

pub mod kv;
#[cfg(test)]
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Opaque byte payloads addressed by a store-assigned path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `payload` and returns the path it was assigned.
    async fn upload(
        &self,
        filename: &str,
        payload: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Reads the blob at `path`. `Ok(None)` means the blob is absent.
    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError>;

    /// Deletes the blob at `path`. Deleting an absent blob is a no-op.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Key-value store holding serialized resume records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// `Ok(None)` means the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Returns every key starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
