//! Job status polling and removal.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use musewave::jobs::JobView;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_job).delete(delete_job))
}

async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<JobView>> {
    state
        .orchestrator
        .job(&id)
        .map(|job| Json(JobView::from(&job)))
        .ok_or_else(|| ApiError::not_found(format!("Job '{}' not found", id)))
}

/// Forgets the job. A pipeline still running for it keeps going, but its
/// later updates are dropped by the store.
async fn delete_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.orchestrator.store().delete(&id) {
        tracing::info!(job_id = %id, "Job deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Job '{}' not found", id)))
    }
}
