use std::sync::Arc;
use std::time::Instant;

use musewave::{EngineSet, Orchestrator};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub engines: Arc<EngineSet>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, engines: Arc<EngineSet>) -> Self {
        Self {
            orchestrator,
            engines,
            start_time: Instant::now(),
        }
    }
}
