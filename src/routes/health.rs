use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, HealthResponse, StatsResponse};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/stats", get(stats))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm = state.engine.llm().llm();

    Json(HealthResponse {
        status: "healthy".to_string(),
        llm_available: llm.check_availability().await,
        llm_provider: llm.provider_name().to_string(),
        model: llm.model().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let store = state.engine.indexer().store().stats().await?;

    Ok(Json(StatsResponse {
        total_documents: store.total_documents,
        collection_name: store.collection_name,
        stored_results: state.results.len().await,
    }))
}
