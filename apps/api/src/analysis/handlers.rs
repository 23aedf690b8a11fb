use std::collections::HashMap;

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::info;

use crate::analysis::pipeline::Analyzer;
use crate::errors::AppError;
use crate::models::record::ResumeRecord;
use crate::state::AppState;

/// POST /api/v1/resumes
///
/// Multipart form: text fields for the job context plus a `file` part with
/// the resume PDF. Runs the full analysis pipeline and returns the completed
/// record.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeRecord>, AppError> {
    let mut values: HashMap<String, String> = HashMap::new();
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("resume.pdf").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            file = Some((filename, data));
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read field {name}: {e}")))?;
            values.insert(record_field(&name), text);
        }
    }

    let (filename, document) =
        file.ok_or_else(|| AppError::Validation("a resume file is required".to_string()))?;

    // Progress statuses are presentation-side; here the log is the consumer.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(status) = rx.recv().await {
            info!("{status}");
        }
    });

    let analyzer = Analyzer::new(
        state.blob_store.clone(),
        state.record_store.clone(),
        state.converter.clone(),
        state.feedback.clone(),
    );
    let record = analyzer.analyze(values, &filename, document, &tx).await?;
    Ok(Json(record))
}

/// Maps form field names to the record's value keys. Unknown fields are
/// stored under their own name.
fn record_field(name: &str) -> String {
    match name {
        "company-name" => "companyName",
        "job-title" => "jobTitle",
        "job-description" => "jobDescription",
        other => other,
    }
    .to_string()
}
