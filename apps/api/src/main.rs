mod analysis;
mod config;
mod convert;
mod errors;
mod llm_client;
mod models;
mod records;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::convert::HttpPdfRenderer;
use crate::llm_client::{LlmClient, LlmFeedbackClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::kv::RedisRecordStore;
use crate::storage::s3::{build_s3_client, S3BlobStore};
use crate::storage::BlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("resumind_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumind API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO blob store
    let s3 = build_s3_client(&config).await;
    let blob_store: Arc<dyn BlobStore> =
        Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!("S3 blob store initialized (bucket: {})", config.s3_bucket);

    // Initialize Redis record store
    let redis = redis::Client::open(config.redis_url.clone())?;
    let record_store = Arc::new(RedisRecordStore::new(redis));
    info!("Redis record store initialized");

    // Initialize PDF renderer
    let converter = Arc::new(HttpPdfRenderer::new(config.pdf_render_url.clone()));
    info!("PDF renderer client initialized ({})", config.pdf_render_url);

    // Initialize LLM-backed feedback client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    let feedback = Arc::new(LlmFeedbackClient::new(llm, blob_store.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state
    let state = AppState {
        blob_store,
        record_store,
        converter,
        feedback,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
