use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::export::ReportContent;
use crate::models::AppState;
use crate::types::{AppError, AppResult};

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Either a path returned by a completed run, or the report itself to render on demand.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub docx_path: Option<String>,
    #[serde(default)]
    pub research_id: Option<String>,
    #[serde(flatten)]
    pub report: ReportContent,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/download/{format}", post(download))
        .with_state(state)
}

async fn attachment(path: &FsPath, mime: &'static str) -> AppResult<Response> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        bytes,
    )
        .into_response())
}

async fn download(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Json(request): Json<DownloadRequest>,
) -> AppResult<Response> {
    let research_id = request
        .research_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (path, mime): (PathBuf, &'static str) = match format.as_str() {
        "pdf" => match request.pdf_path.as_deref() {
            Some(path) => (state.exporter.resolve_download(path)?, PDF_MIME),
            None => (state.exporter.write_pdf(&request.report, &research_id).await?, PDF_MIME),
        },
        "docx" => match request.docx_path.as_deref() {
            Some(path) => (state.exporter.resolve_download(path)?, DOCX_MIME),
            None => (state.exporter.write_docx(&request.report, &research_id).await?, DOCX_MIME),
        },
        _ => return Err(AppError::InvalidRequest("Invalid format".to_string())),
    };

    info!(path = %path.display(), "Serving report download");
    attachment(&path, mime).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_bytes, body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_format() {
        let (state, _dir) = test_state().await;
        let resp = router(state)
            .oneshot(post_json("/api/download/txt", json!({ "topic": "t" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({ "error": "Invalid format" }));
    }

    #[tokio::test]
    async fn test_pdf_generated_on_demand() {
        let (state, _dir) = test_state().await;
        let resp = router(state)
            .oneshot(post_json(
                "/api/download/pdf",
                json!({ "topic": "Graphene", "synthesis": "## Introduction\nText.", "bibliography": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], PDF_MIME);
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"research_Graphene_"));
        assert!(body_bytes(resp).await.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_existing_docx_path_is_served() {
        let (state, _dir) = test_state().await;
        let report = ReportContent { topic: "T".into(), synthesis: "Body.".into(), bibliography: String::new() };
        let path = state.exporter.write_docx(&report, "0123456789").await.unwrap();

        let resp = router(state)
            .oneshot(post_json("/api/download/docx", json!({ "docx_path": path.display().to_string() })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], DOCX_MIME);
        assert!(body_bytes(resp).await.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_paths_outside_output_dir_are_refused() {
        let (state, _dir) = test_state().await;
        let resp = router(state)
            .oneshot(post_json("/api/download/pdf", json!({ "pdf_path": "/etc/passwd" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
