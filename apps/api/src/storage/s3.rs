//! S3 / MinIO blob store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::storage::{BlobStore, StorageError};

#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = aws_sdk_s3::config::Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resumind-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        filename: &str,
        payload: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        // Store-assigned path: a fresh prefix per upload so filenames never collide.
        let path = format!("uploads/{}/{}", Uuid::new_v4(), filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&path)
            .body(ByteStream::from(payload))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 upload failed: {e}")))?;

        info!("Uploaded blob to s3://{}/{}", self.bucket, path);
        Ok(path)
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    debug!("Blob s3://{}/{} is absent", self.bucket, path);
                    return Ok(None);
                }
                return Err(StorageError::Backend(format!("S3 read failed: {e}")));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 body read failed: {e}")))?;
        Ok(Some(data.into_bytes()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        // S3 DeleteObject succeeds for absent keys, which matches the
        // absent-is-already-deleted contract.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 delete failed: {e}")))?;

        info!("Deleted blob s3://{}/{}", self.bucket, path);
        Ok(())
    }
}
