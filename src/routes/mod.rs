//! API Routes
//!
//! HTTP endpoints of the research service:
//! - `/api/research/stream` - Run a research job, streamed as server-sent events
//! - `/api/research/{id}` - Fetch a completed run
//! - `/api/download/{format}` - Download a PDF or DOCX report
//! - `/api/health` - LLM availability
//! - `/api/stats` - Vector store and result store statistics

pub mod download;
pub mod health;
pub mod research;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(research::router(state.clone()))
        .merge(download::router(state.clone()))
        .merge(health::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
