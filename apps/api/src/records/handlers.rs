use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::record::ResumeRecord;
use crate::records::presenter::{DeleteConfirmation, DeleteOutcome, RecordPresenter};
use crate::state::AppState;

fn presenter(state: &AppState) -> RecordPresenter {
    RecordPresenter::new(state.blob_store.clone(), state.record_store.clone())
}

async fn require_record(state: &AppState, id: &str) -> Result<ResumeRecord, AppError> {
    presenter(state)
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(presenter(&state).list().await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(require_record(&state, &id).await?))
}

/// GET /api/v1/resumes/:id/preview
///
/// Serves the stored preview image. A missing or unreadable blob is a 404;
/// the client renders the record without a preview instead of hiding it.
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let record = require_record(&state, &id).await?;
    let payload = presenter(&state)
        .load_preview(&record)
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], payload).into_response())
}

#[derive(Deserialize)]
pub struct DeleteParams {
    /// The explicit confirmation gate. Without `confirm=true` the delete is
    /// silently cancelled, with no side effects.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// DELETE /api/v1/resumes/:id?confirm=true
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, AppError> {
    let record = require_record(&state, &id).await?;
    let confirmation = if params.confirm {
        DeleteConfirmation::Confirmed
    } else {
        DeleteConfirmation::Denied
    };
    let outcome = presenter(&state).delete(&record, confirmation).await?;
    Ok(Json(DeleteResponse {
        deleted: outcome == DeleteOutcome::Deleted,
    }))
}
