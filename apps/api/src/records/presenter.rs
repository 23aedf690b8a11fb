//! Record lifecycle operations on persisted resume records: listing, preview
//! loading, and confirmation-gated deletion.
//!
//! A record moves through Creating (blobs up, no KV entry yet) → Partial
//! (KV entry, empty feedback) → Complete (feedback attached) → Deleted.
//! The earlier transitions belong to the analysis pipeline; only deletion is
//! triggered here.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::record::{key_prefix, record_key, ResumeRecord};
use crate::storage::{BlobStore, RecordStore, StorageError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("preview image {0} is missing")]
    Missing(String),

    #[error("failed to read preview image: {0}")]
    Storage(#[from] StorageError),
}

/// Which sub-deletions of a delete failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteTarget {
    KeyValue,
    ResumeBlob,
    ImageBlob,
}

/// A delete that left targets behind. The sub-deletions that succeeded are
/// not undone; the caller may retry the failed ones.
#[derive(Debug, Error)]
#[error("delete incomplete, failed targets: {failed:?}")]
pub struct DeleteError {
    pub failed: Vec<DeleteTarget>,
}

/// Explicit yes/no gate passed by the caller before anything destructive runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteConfirmation {
    Confirmed,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Clone)]
pub struct RecordPresenter {
    blob_store: Arc<dyn BlobStore>,
    record_store: Arc<dyn RecordStore>,
}

impl RecordPresenter {
    pub fn new(blob_store: Arc<dyn BlobStore>, record_store: Arc<dyn RecordStore>) -> Self {
        Self {
            blob_store,
            record_store,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<ResumeRecord>, StorageError> {
        let Some(serialized) = self.record_store.get(&record_key(id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&serialized) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Record {id} failed to deserialize: {e}");
                Ok(None)
            }
        }
    }

    /// Lists every stored record. Entries that no longer deserialize are
    /// skipped rather than failing the whole listing.
    pub async fn list(&self) -> Result<Vec<ResumeRecord>, StorageError> {
        let keys = self.record_store.list_keys(key_prefix()).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(serialized) = self.record_store.get(&key).await? else {
                continue; // deleted between SCAN and GET
            };
            match serde_json::from_str::<ResumeRecord>(&serialized) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unparseable record at {key}: {e}"),
            }
        }
        // Newest first for display.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Reads the record's preview image. A missing blob is a `LoadError`;
    /// callers degrade to rendering the record without a preview.
    pub async fn load_preview(&self, record: &ResumeRecord) -> Result<Bytes, LoadError> {
        self.blob_store
            .read(&record.image_path)
            .await?
            .ok_or_else(|| LoadError::Missing(record.image_path.clone()))
    }

    /// Deletes the record's KV entry and both of its blobs, best-effort.
    ///
    /// Every sub-deletion is attempted even if an earlier one fails; the set
    /// of failures is reported at the end. Deleting an already-absent key or
    /// blob counts as success. A denied confirmation returns `Cancelled` with
    /// no side effects.
    pub async fn delete(
        &self,
        record: &ResumeRecord,
        confirmation: DeleteConfirmation,
    ) -> Result<DeleteOutcome, DeleteError> {
        if confirmation == DeleteConfirmation::Denied {
            return Ok(DeleteOutcome::Cancelled);
        }

        let mut failed = Vec::new();

        if let Err(e) = self.record_store.delete(&record.key()).await {
            warn!("Failed to delete record entry {}: {e}", record.key());
            failed.push(DeleteTarget::KeyValue);
        }
        if let Err(e) = self.blob_store.delete(&record.resume_path).await {
            warn!("Failed to delete resume blob {}: {e}", record.resume_path);
            failed.push(DeleteTarget::ResumeBlob);
        }
        if let Err(e) = self.blob_store.delete(&record.image_path).await {
            warn!("Failed to delete image blob {}: {e}", record.image_path);
            failed.push(DeleteTarget::ImageBlob);
        }

        if failed.is_empty() {
            info!("Deleted record {} and its blobs", record.id);
            Ok(DeleteOutcome::Deleted)
        } else {
            Err(DeleteError { failed })
        }
    }
}
