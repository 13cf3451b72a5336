//! Job submission.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use musewave::{GenerationRequest, Submission};

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(generate))
}

/// Accepts a request and answers before any stage runs.
async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let Json(request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let submission = state.orchestrator.submit(request)?;
    Ok((StatusCode::ACCEPTED, Json(submission)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{json_body, post_json, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_returns_job_id_and_plan() {
        let app = TestApp::new();
        let response = app
            .send(post_json(
                "/api/generate",
                json!({ "musicPrompt": "night drive", "genres": ["techno"], "duration": 60 }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        let job_id = body["jobId"].as_str().unwrap();
        assert!(app.state.orchestrator.job(job_id).is_some());
        assert_eq!(body["plan"]["bpm"], 128);
        assert!(body["plan"]["sections"].is_array());

        app.state.orchestrator.supervisor().wait_idle().await;
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_fields() {
        let app = TestApp::new();
        let response = app
            .send(post_json(
                "/api/generate",
                json!({ "musicPrompt": "  ", "duration": 500, "videoStyles": ["Claymation"] }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["musicPrompt", "duration", "videoStyles"]);
        assert!(app.state.orchestrator.store().is_empty());
    }

    #[tokio::test]
    async fn test_generate_rejects_malformed_body() {
        let app = TestApp::new();
        let response = app
            .send(post_json("/api/generate", json!({ "duration": 60 })))
            .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains("musicPrompt"));
    }

    #[tokio::test]
    async fn test_generate_during_shutdown_is_unavailable() {
        let app = TestApp::new();
        app.state
            .orchestrator
            .supervisor()
            .shutdown(std::time::Duration::from_millis(10))
            .await;

        let response = app
            .send(post_json("/api/generate", json!({ "musicPrompt": "late" })))
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
