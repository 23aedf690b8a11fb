pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::get,
    Router,
};

use crate::analysis;
use crate::records;
use crate::state::AppState;

/// Resume uploads are capped well above any realistic resume PDF.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resumes",
            get(records::handlers::handle_list).post(analysis::handlers::handle_analyze),
        )
        .route(
            "/api/v1/resumes/:id",
            get(records::handlers::handle_get).delete(records::handlers::handle_delete),
        )
        .route(
            "/api/v1/resumes/:id/preview",
            get(records::handlers::handle_preview),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
