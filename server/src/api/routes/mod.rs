//! Route registration.

use axum::Router;
use tower_http::services::ServeDir;

use crate::state::AppState;

pub mod generate;
pub mod generations;
pub mod health;
pub mod jobs;

/// Builds the full application router: the JSON API plus static assets.
pub fn create_router(state: AppState) -> Router {
    let layout = state.orchestrator.layout();
    let prefix = layout.url_prefix().to_string();
    let assets = ServeDir::new(layout.root());

    Router::new()
        .nest("/api/generate", generate::router())
        .nest("/api/jobs", jobs::router())
        .nest("/api/generations", generations::router())
        .nest("/api/health", health::router())
        .nest_service(&prefix, assets)
        .with_state(state)
}
