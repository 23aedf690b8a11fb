//! Analysis pipeline — orchestrates the full upload-and-analyze workflow.
//!
//! Flow: upload resume → convert to preview image → upload image →
//!       persist partial record → request feedback → parse → persist final.
//!
//! Steps run strictly in sequence; each one's input is the previous one's
//! output. The first failure aborts the remaining steps and surfaces as a
//! `PipelineError`. Nothing is rolled back: blobs and the partial record
//! committed by earlier steps stay in place, and cleanup of such orphans is
//! deliberately out of scope here.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::convert::DocumentConverter;
use crate::llm_client::{strip_json_fences, FeedbackClient};
use crate::models::feedback::Feedback;
use crate::models::record::{generate_id, ResumeRecord};
use crate::storage::{BlobStore, RecordStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to upload {0}")]
    UploadFailed(&'static str),

    #[error("Failed to convert PDF to image")]
    ConversionFailed,

    #[error("Failed to persist {0}")]
    PersistFailed(&'static str),

    /// Carries the raw response text (or transport error) for diagnostics.
    #[error("Failed to analyze resume: {0}")]
    InferenceFailed(String),
}

/// Runs the analysis pipeline against injected collaborator handles.
#[derive(Clone)]
pub struct Analyzer {
    blob_store: Arc<dyn BlobStore>,
    record_store: Arc<dyn RecordStore>,
    converter: Arc<dyn DocumentConverter>,
    feedback: Arc<dyn FeedbackClient>,
}

impl Analyzer {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        record_store: Arc<dyn RecordStore>,
        converter: Arc<dyn DocumentConverter>,
        feedback: Arc<dyn FeedbackClient>,
    ) -> Self {
        Self {
            blob_store,
            record_store,
            converter,
            feedback,
        }
    }

    /// Analyzes one uploaded resume and returns the completed record.
    ///
    /// Human-readable status lines are emitted on `progress` as the pipeline
    /// advances; they are presentation-only and not part of the contract.
    pub async fn analyze(
        &self,
        values: HashMap<String, String>,
        filename: &str,
        document: Bytes,
        progress: &UnboundedSender<String>,
    ) -> Result<ResumeRecord, PipelineError> {
        report(progress, "Uploading your resume...");
        let resume_path = self
            .blob_store
            .upload(filename, document.clone(), "application/pdf")
            .await
            .map_err(|e| {
                warn!("Resume upload failed: {e}");
                PipelineError::UploadFailed("source document")
            })?;

        report(progress, "Converting to image...");
        let image = self.converter.convert(&document).await.map_err(|e| {
            warn!("PDF conversion failed: {e}");
            PipelineError::ConversionFailed
        })?;

        report(progress, "Uploading the image...");
        let image_path = self
            .blob_store
            .upload(&image.filename, image.payload, &image.content_type)
            .await
            .map_err(|e| {
                warn!("Preview image upload failed: {e}");
                PipelineError::UploadFailed("preview image")
            })?;

        report(progress, "Preparing data...");
        let mut record = ResumeRecord::partial(generate_id(), resume_path, image_path, values);
        self.persist(&record, "partial record").await?;
        info!("Persisted partial record {}", record.key());

        report(progress, "Analyzing your resume...");
        let job_title = field(&record.values, "jobTitle");
        let job_description = field(&record.values, "jobDescription");
        let prompt = super::prompts::prepare_instructions(job_title, job_description);
        let message = self
            .feedback
            .feedback(&record.resume_path, &prompt)
            .await
            .map_err(|e| PipelineError::InferenceFailed(e.to_string()))?;

        // Content may be a plain string or a sequence of text segments.
        let text = message.text().ok_or_else(|| {
            PipelineError::InferenceFailed("inference response contained no text".to_string())
        })?;
        let feedback: Feedback =
            serde_json::from_str(strip_json_fences(text)).map_err(|e| {
                warn!("Feedback did not parse as JSON: {e}");
                PipelineError::InferenceFailed(text.to_string())
            })?;

        record.attach_feedback(feedback);
        self.persist(&record, "final record").await?;
        info!("Analysis complete for record {}", record.key());

        report(progress, "Analysis complete");
        Ok(record)
    }

    async fn persist(
        &self,
        record: &ResumeRecord,
        which: &'static str,
    ) -> Result<(), PipelineError> {
        let serialized = serde_json::to_string(record).map_err(|e| {
            warn!("Record serialization failed: {e}");
            PipelineError::PersistFailed(which)
        })?;
        self.record_store
            .set(&record.key(), &serialized)
            .await
            .map_err(|e| {
                warn!("Record persist failed: {e}");
                PipelineError::PersistFailed(which)
            })
    }
}

fn field<'a>(values: &'a HashMap<String, String>, key: &str) -> &'a str {
    values.get(key).map(String::as_str).unwrap_or("")
}

fn report(progress: &UnboundedSender<String>, status: &str) {
    debug!("{status}");
    // The consumer may have gone away; the pipeline does not care.
    let _ = progress.send(status.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::convert::{ConvertError, ConvertedImage};
    use crate::llm_client::{FeedbackMessage, LlmError, MessageContent, TextSegment};
    use crate::models::record::record_key;
    use crate::storage::memory::{events, new_log, EventLog, MemoryBlobStore, MemoryRecordStore};

    const FEEDBACK_JSON: &str = r#"{
        "overallScore": 82,
        "ATS": {"score": 78, "tips": [{"type": "good", "tip": "Standard section headings"}]},
        "toneAndStyle": {"score": 80, "tips": []},
        "content": {"score": 85, "tips": []},
        "structure": {"score": 88, "tips": []},
        "skills": {"score": 75, "tips": []}
    }"#;

    struct StubConverter {
        image: Option<Bytes>,
        log: EventLog,
    }

    #[async_trait]
    impl DocumentConverter for StubConverter {
        async fn convert(&self, _document: &Bytes) -> Result<ConvertedImage, ConvertError> {
            self.log.lock().unwrap().push("convert".to_string());
            match &self.image {
                Some(payload) => Ok(ConvertedImage {
                    payload: payload.clone(),
                    content_type: "image/png".to_string(),
                    filename: "resume-preview.png".to_string(),
                }),
                None => Err(ConvertError::Empty),
            }
        }
    }

    struct ScriptedFeedback {
        message: Option<FeedbackMessage>,
        log: EventLog,
    }

    #[async_trait]
    impl FeedbackClient for ScriptedFeedback {
        async fn feedback(
            &self,
            _resume_path: &str,
            _prompt: &str,
        ) -> Result<FeedbackMessage, LlmError> {
            self.log.lock().unwrap().push("feedback".to_string());
            self.message.clone().ok_or(LlmError::EmptyContent)
        }
    }

    struct Fixture {
        analyzer: Analyzer,
        blobs: Arc<MemoryBlobStore>,
        records: Arc<MemoryRecordStore>,
        log: EventLog,
    }

    fn segments(json: &str) -> FeedbackMessage {
        FeedbackMessage {
            content: MessageContent::Segments(vec![TextSegment {
                text: json.to_string(),
            }]),
        }
    }

    fn fixture(converter_image: Option<Bytes>, message: Option<FeedbackMessage>) -> Fixture {
        let log = new_log();
        let blobs = Arc::new(MemoryBlobStore::with_log(log.clone()));
        let records = Arc::new(MemoryRecordStore::with_log(log.clone()));
        let converter = Arc::new(StubConverter {
            image: converter_image,
            log: log.clone(),
        });
        let feedback = Arc::new(ScriptedFeedback {
            message,
            log: log.clone(),
        });
        let analyzer = Analyzer::new(blobs.clone(), records.clone(), converter, feedback);
        Fixture {
            analyzer,
            blobs,
            records,
            log,
        }
    }

    fn job_values() -> HashMap<String, String> {
        let mut values = HashMap::new();
        values.insert("jobTitle".to_string(), "Engineer".to_string());
        values.insert("jobDescription".to_string(), "Build things".to_string());
        values
    }

    async fn run(
        fixture: &Fixture,
        values: HashMap<String, String>,
    ) -> (
        Result<ResumeRecord, PipelineError>,
        Vec<String>,
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = fixture
            .analyzer
            .analyze(values, "resume.pdf", Bytes::from_static(b"%PDF-1.4"), &tx)
            .await;
        drop(tx);
        let mut statuses = Vec::new();
        while let Some(status) = rx.recv().await {
            statuses.push(status);
        }
        (result, statuses)
    }

    #[tokio::test]
    async fn test_full_success_returns_complete_record() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments(FEEDBACK_JSON)),
        );
        let (result, statuses) = run(&fixture, job_values()).await;
        let record = result.unwrap();

        assert!(!record.id.is_empty());
        assert!(record.resume_path.ends_with("resume.pdf"));
        assert!(record.image_path.ends_with("resume-preview.png"));
        assert_eq!(record.values.get("jobTitle").unwrap(), "Engineer");
        assert_eq!(record.feedback.as_ref().unwrap().overall_score, 82);

        // The durable copy matches what the caller got back.
        let stored = fixture.records.entry(&record.key()).unwrap();
        let stored: ResumeRecord = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, record);

        assert_eq!(statuses.first().unwrap(), "Uploading your resume...");
        assert_eq!(statuses.last().unwrap(), "Analysis complete");
    }

    #[tokio::test]
    async fn test_independent_runs_get_distinct_ids() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments(FEEDBACK_JSON)),
        );
        let (first, _) = run(&fixture, job_values()).await;
        let (second, _) = run(&fixture, job_values()).await;
        assert_ne!(first.unwrap().id, second.unwrap().id);
    }

    #[tokio::test]
    async fn test_steps_run_in_strict_sequence() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments(FEEDBACK_JSON)),
        );
        let (result, _) = run(&fixture, job_values()).await;
        result.unwrap();

        let ops: Vec<String> = events(&fixture.log)
            .into_iter()
            .map(|e| e.split_whitespace().next().unwrap().to_string())
            .collect();
        assert_eq!(
            ops,
            vec![
                "blob.upload", // source document
                "convert",
                "blob.upload", // preview image
                "kv.set",      // partial record
                "feedback",
                "kv.set", // final record
            ]
        );
    }

    #[tokio::test]
    async fn test_conversion_failure_aborts_before_any_record() {
        let fixture = fixture(None, Some(segments(FEEDBACK_JSON)));
        let (result, statuses) = run(&fixture, job_values()).await;
        assert!(matches!(result, Err(PipelineError::ConversionFailed)));
        assert_eq!(fixture.records.len(), 0);
        // The uploaded source blob is orphaned on purpose: no rollback.
        assert_eq!(fixture.blobs.blob_count(), 1);
        assert!(!statuses.contains(&"Analyzing your resume...".to_string()));
    }

    #[tokio::test]
    async fn test_preview_upload_failure_aborts_before_partial_persist() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments(FEEDBACK_JSON)),
        );
        fixture.blobs.deny_upload("resume-preview.png");
        let (result, _) = run(&fixture, job_values()).await;
        assert!(matches!(
            result,
            Err(PipelineError::UploadFailed("preview image"))
        ));
        assert_eq!(fixture.records.len(), 0);
    }

    #[tokio::test]
    async fn test_partial_persist_failure_surfaces_as_persist_failed() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments(FEEDBACK_JSON)),
        );
        fixture.records.fail_sets();
        let (result, _) = run(&fixture, job_values()).await;
        assert!(matches!(
            result,
            Err(PipelineError::PersistFailed("partial record"))
        ));
    }

    #[tokio::test]
    async fn test_inference_failure_leaves_partial_record_durable() {
        let fixture = fixture(Some(Bytes::from_static(b"png")), None);
        let (result, _) = run(&fixture, job_values()).await;
        assert!(matches!(result, Err(PipelineError::InferenceFailed(_))));

        // Exactly one record, retrievable under its key, with empty feedback.
        assert_eq!(fixture.records.len(), 1);
        let ops = events(&fixture.log);
        let key = ops
            .iter()
            .find_map(|e| e.strip_prefix("kv.set "))
            .unwrap()
            .to_string();
        let stored: ResumeRecord =
            serde_json::from_str(&fixture.records.entry(&key).unwrap()).unwrap();
        assert!(!stored.is_complete());
        assert_eq!(record_key(&stored.id), key);
    }

    #[tokio::test]
    async fn test_malformed_feedback_captures_raw_text() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments("this is not JSON")),
        );
        let (result, _) = run(&fixture, job_values()).await;
        match result {
            Err(PipelineError::InferenceFailed(raw)) => {
                assert!(raw.contains("this is not JSON"))
            }
            other => panic!("expected InferenceFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_string_content_parses_like_segments() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(FeedbackMessage {
                content: MessageContent::Text(FEEDBACK_JSON.to_string()),
            }),
        );
        let (result, _) = run(&fixture, job_values()).await;
        assert_eq!(result.unwrap().feedback.unwrap().overall_score, 82);
    }

    #[tokio::test]
    async fn test_fenced_feedback_json_is_accepted() {
        let fenced = format!("```json\n{FEEDBACK_JSON}\n```");
        let fixture = fixture(Some(Bytes::from_static(b"png")), Some(segments(&fenced)));
        let (result, _) = run(&fixture, job_values()).await;
        assert!(result.unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_empty_values_do_not_abort() {
        let fixture = fixture(
            Some(Bytes::from_static(b"png")),
            Some(segments(FEEDBACK_JSON)),
        );
        let (result, _) = run(&fixture, HashMap::new()).await;
        let record = result.unwrap();
        assert!(record.values.is_empty());
        assert!(record.is_complete());
    }
}
