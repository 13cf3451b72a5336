//! Completed generation history.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use musewave::GenerationRecord;

use crate::api::error::ApiResult;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_generations))
}

/// Most recent records first.
async fn list_generations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<GenerationRecord>>> {
    let records = state.orchestrator.records().list(query.effective_limit())?;
    Ok(Json(records))
}
