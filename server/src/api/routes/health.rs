//! Health check routes.

use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// Capability key to availability, as detected at startup.
    pub engines: BTreeMap<String, bool>,
    pub jobs_tracked: usize,
    pub jobs_in_flight: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        engines: state.engines.probe().snapshot().capabilities,
        jobs_tracked: orchestrator.store().len(),
        jobs_in_flight: orchestrator.supervisor().in_flight_count(),
    })
}
