//! LLM client — the single point of entry for all Claude API calls in
//! Resumind. Every inference-backed feature goes through [`FeedbackClient`];
//! no other module may call the Anthropic API directly.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::BlobStore;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls. Hardcoded to prevent drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("document error: {0}")]
    Document(String),
}

/// Inference collaborator: given a stored-document reference and a prompt,
/// returns a feedback message. The pipeline depends on this trait, not on the
/// concrete Anthropic-backed client, so tests can script responses.
#[async_trait]
pub trait FeedbackClient: Send + Sync {
    async fn feedback(&self, resume_path: &str, prompt: &str)
        -> Result<FeedbackMessage, LlmError>;
}

/// A feedback response message. `content` arrives either as one plain string
/// or as a sequence of text segments; both forms are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<TextSegment>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
}

impl FeedbackMessage {
    /// The textual content: the string itself, or the first segment when the
    /// content is a sequence.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text.as_str()),
            MessageContent::Segments(segments) => segments.first().map(|s| s.text.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Thin wrapper around the Anthropic Messages API with retry on 429/5xx.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Claude API. Retries rate limits and server
    /// errors with exponential backoff; other failures surface immediately.
    async fn call(&self, prompt: &str, system: &str) -> Result<AnthropicResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: AnthropicResponse =
                response.json().await.map_err(LlmError::Http)?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Claude-backed [`FeedbackClient`]. Resolves the stored resume, extracts its
/// text, and asks the model for structured feedback.
#[derive(Clone)]
pub struct LlmFeedbackClient {
    llm: LlmClient,
    blob_store: Arc<dyn BlobStore>,
}

impl LlmFeedbackClient {
    pub fn new(llm: LlmClient, blob_store: Arc<dyn BlobStore>) -> Self {
        Self { llm, blob_store }
    }
}

#[async_trait]
impl FeedbackClient for LlmFeedbackClient {
    async fn feedback(
        &self,
        resume_path: &str,
        prompt: &str,
    ) -> Result<FeedbackMessage, LlmError> {
        let document = self
            .blob_store
            .read(resume_path)
            .await
            .map_err(|e| LlmError::Document(e.to_string()))?
            .ok_or_else(|| {
                LlmError::Document(format!("stored resume {resume_path} is missing"))
            })?;

        // pdf-extract is CPU-bound; keep it off the async worker threads.
        let bytes = document.to_vec();
        let resume_text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
        })
        .await
        .map_err(|e| LlmError::Document(format!("text extraction task failed: {e}")))?
        .map_err(|e| LlmError::Document(format!("failed to extract resume text: {e}")))?;

        let full_prompt = format!("{prompt}\n\nResume:\n{resume_text}");
        let response = self.llm.call(&full_prompt, prompts::FEEDBACK_SYSTEM).await?;

        let segments: Vec<TextSegment> = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .map(|text| TextSegment { text })
            .collect();
        if segments.is_empty() {
            return Err(LlmError::EmptyContent);
        }

        Ok(FeedbackMessage {
            content: MessageContent::Segments(segments),
        })
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_message_text_from_plain_string() {
        let message = FeedbackMessage {
            content: MessageContent::Text("hello".to_string()),
        };
        assert_eq!(message.text(), Some("hello"));
    }

    #[test]
    fn test_message_text_uses_first_segment() {
        let message = FeedbackMessage {
            content: MessageContent::Segments(vec![
                TextSegment {
                    text: "first".to_string(),
                },
                TextSegment {
                    text: "second".to_string(),
                },
            ]),
        };
        assert_eq!(message.text(), Some("first"));
    }

    #[test]
    fn test_message_text_empty_segments_is_none() {
        let message = FeedbackMessage {
            content: MessageContent::Segments(vec![]),
        };
        assert_eq!(message.text(), None);
    }

    #[test]
    fn test_message_content_deserializes_both_wire_forms() {
        let plain: FeedbackMessage =
            serde_json::from_str(r#"{"content": "{\"ok\":true}"}"#).unwrap();
        assert_eq!(plain.text(), Some("{\"ok\":true}"));

        let segmented: FeedbackMessage =
            serde_json::from_str(r#"{"content": [{"text": "{\"ok\":true}"}]}"#).unwrap();
        assert_eq!(segmented.text(), Some("{\"ok\":true}"));
    }
}
