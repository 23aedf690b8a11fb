//! Redis-backed record store.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use crate::storage::{RecordStore, StorageError};

#[derive(Clone)]
pub struct RedisRecordStore {
    client: redis::Client,
}

impl RedisRecordStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StorageError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Backend(format!("Redis connection failed: {e}")))
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut con = self.connection().await?;
        let _: () = con
            .set(key, value)
            .await
            .map_err(|e| StorageError::Backend(format!("Redis SET {key} failed: {e}")))?;
        debug!("SET {key}");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut con = self.connection().await?;
        let value: Option<String> = con
            .get(key)
            .await
            .map_err(|e| StorageError::Backend(format!("Redis GET {key} failed: {e}")))?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut con = self.connection().await?;
        // DEL returns the number of keys removed; 0 (absent) is still success.
        let removed: i64 = con
            .del(key)
            .await
            .map_err(|e| StorageError::Backend(format!("Redis DEL {key} failed: {e}")))?;
        debug!("DEL {key} removed {removed}");
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut con = self.connection().await?;
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = con
                .scan_match(&pattern)
                .await
                .map_err(|e| StorageError::Backend(format!("Redis SCAN {pattern} failed: {e}")))?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
