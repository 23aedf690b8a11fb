//! Document converter seam: turns an uploaded PDF into a single preview image.
//!
//! The concrete implementation delegates to an external rendering service
//! (PDF in, PNG out) over HTTP; the pipeline only sees the trait.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("renderer returned status {status}: {message}")]
    Renderer { status: u16, message: String },

    #[error("conversion produced no image")]
    Empty,
}

/// The preview image produced from one source document.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    pub payload: Bytes,
    pub content_type: String,
    pub filename: String,
}

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, document: &Bytes) -> Result<ConvertedImage, ConvertError>;
}

/// HTTP client for the PDF rendering service.
#[derive(Clone)]
pub struct HttpPdfRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPdfRenderer {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
        }
    }
}

#[async_trait]
impl DocumentConverter for HttpPdfRenderer {
    async fn convert(&self, document: &Bytes) -> Result<ConvertedImage, ConvertError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/pdf")
            .body(document.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConvertError::Renderer {
                status: status.as_u16(),
                message,
            });
        }

        let payload = response.bytes().await?;
        if payload.is_empty() {
            return Err(ConvertError::Empty);
        }
        debug!("Rendered preview image ({} bytes)", payload.len());

        Ok(ConvertedImage {
            payload,
            content_type: "image/png".to_string(),
            filename: "resume-preview.png".to_string(),
        })
    }
}
