//! In-memory fakes for the storage traits, shared by the pipeline and
//! presenter tests. Each fake records the calls it receives in an `EventLog`
//! so tests can assert on sequencing, and supports targeted fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::{BlobStore, RecordStore, StorageError};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    log: EventLog,
    denied_uploads: Mutex<HashSet<String>>,
    denied_deletes: Mutex<HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_log(new_log())
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            log,
            denied_uploads: Mutex::new(HashSet::new()),
            denied_deletes: Mutex::new(HashSet::new()),
        }
    }

    pub fn insert(&self, path: &str, payload: Bytes) {
        self.blobs.lock().unwrap().insert(path.to_string(), payload);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(path)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Makes every upload of `filename` fail.
    pub fn deny_upload(&self, filename: &str) {
        self.denied_uploads
            .lock()
            .unwrap()
            .insert(filename.to_string());
    }

    /// Makes every delete of `path` fail.
    pub fn deny_delete(&self, path: &str) {
        self.denied_deletes.lock().unwrap().insert(path.to_string());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        filename: &str,
        payload: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("blob.upload {filename}"));
        if self.denied_uploads.lock().unwrap().contains(filename) {
            return Err(StorageError::Backend(format!(
                "upload of {filename} denied"
            )));
        }
        let path = format!("uploads/{}/{}", Uuid::new_v4(), filename);
        self.blobs.lock().unwrap().insert(path.clone(), payload);
        Ok(path)
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError> {
        self.log.lock().unwrap().push(format!("blob.read {path}"));
        Ok(self.blobs.lock().unwrap().get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.log.lock().unwrap().push(format!("blob.delete {path}"));
        if self.denied_deletes.lock().unwrap().contains(path) {
            return Err(StorageError::Backend(format!("delete of {path} denied")));
        }
        self.blobs.lock().unwrap().remove(path);
        Ok(())
    }
}

pub struct MemoryRecordStore {
    entries: Mutex<HashMap<String, String>>,
    log: EventLog,
    fail_sets: Mutex<bool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::with_log(new_log())
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            log,
            fail_sets: Mutex::new(false),
        }
    }

    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn fail_sets(&self) {
        *self.fail_sets.lock().unwrap() = true;
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.log.lock().unwrap().push(format!("kv.set {key}"));
        if *self.fail_sets.lock().unwrap() {
            return Err(StorageError::Backend("set denied".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.log.lock().unwrap().push(format!("kv.delete {key}"));
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
