use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::models::{AppState, CompletedResearch, ExportFormat, ResearchDepth, ResearchEvent, ResearchStreamParams};
use crate::synthesis::{spawn_research, ResearchJob};
use crate::types::{AppError, AppResult};

const KEEP_ALIVE: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/research/stream", get(stream_research))
        .route("/api/research/{research_id}", get(get_research))
        .with_state(state)
}

fn to_sse(event: &ResearchEvent) -> Event {
    let data = match event {
        ResearchEvent::Progress(progress) => serde_json::to_value(progress),
        ResearchEvent::Complete(completed) => serde_json::to_value(completed.as_ref()),
        ResearchEvent::Error { error } => Ok(json!({ "error": error })),
    };

    match data {
        Ok(data) => Event::default().event(event.name()).data(data.to_string()),
        Err(e) => Event::default()
            .event("error")
            .data(json!({ "error": format!("Cannot encode event: {}", e) }).to_string()),
    }
}

/// Start a run and stream its progress; the stream ends after `complete` or `error`.
async fn stream_research(
    State(state): State<AppState>,
    Query(params): Query<ResearchStreamParams>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let topic = params.topic.trim().to_string();
    if params.validate().is_err() || topic.is_empty() {
        return Err(AppError::InvalidRequest("Topic is required".to_string()));
    }

    let job = ResearchJob {
        topic,
        depth: params
            .depth
            .as_deref()
            .map(ResearchDepth::from_id)
            .unwrap_or(state.config.research.default_depth),
        format: params.format.as_deref().map(ExportFormat::from_id).unwrap_or_default(),
    };
    info!(topic = %job.topic, depth = %job.depth, format = ?job.format, "Research stream requested");

    let handle = spawn_research(state.engine.clone(), state.exporter.clone(), state.results.clone(), job);
    let stream = handle.map(|event| Ok(to_sse(&event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}

async fn get_research(
    State(state): State<AppState>,
    Path(research_id): Path<String>,
) -> AppResult<Json<CompletedResearch>> {
    state
        .results
        .get(&research_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Research {} not found", research_id)))
}
