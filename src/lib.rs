// Deep Research - automated research pipeline producing cited reports

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;     // Web search backends (Tavily, SerpAPI) plus aggregation and scoring
pub mod embeddings;
pub mod synthesis;
pub mod export;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
