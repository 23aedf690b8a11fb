use std::sync::Arc;

use crate::config::Config;
use crate::convert::DocumentConverter;
use crate::llm_client::FeedbackClient;
use crate::storage::{BlobStore, RecordStore};

/// Shared application state injected into all route handlers via Axum
/// extractors. Collaborators are held behind their traits so handlers and
/// tests are never tied to S3, Redis, or the Anthropic API specifically.
#[derive(Clone)]
pub struct AppState {
    pub blob_store: Arc<dyn BlobStore>,
    pub record_store: Arc<dyn RecordStore>,
    pub converter: Arc<dyn DocumentConverter>,
    pub feedback: Arc<dyn FeedbackClient>,
    pub config: Config,
}
