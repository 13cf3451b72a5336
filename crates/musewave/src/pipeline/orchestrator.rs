use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::EngineSet;
use crate::error::MuseError;
use crate::jobs::{Job, JobStore};
use crate::planner::{plan, Plan};
use crate::records::RecordStore;
use crate::sanitize;
use crate::storage::AssetLayout;
use crate::worker::JobSupervisor;

use super::context::PipelineContext;
use super::progress::StoreProgress;
use super::request::GenerationRequest;
use super::runner::Pipeline;

/// Immediate answer to a submitted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub job_id: String,
    pub plan: Plan,
}

/// Accepts requests, creates their jobs and runs them in the background.
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    records: Arc<dyn RecordStore>,
    pipeline: Arc<Pipeline>,
    layout: AssetLayout,
    supervisor: Arc<JobSupervisor>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        records: Arc<dyn RecordStore>,
        engines: Arc<EngineSet>,
        layout: AssetLayout,
        supervisor: Arc<JobSupervisor>,
    ) -> Self {
        let pipeline = Arc::new(Pipeline::new(engines, Arc::clone(&records)));
        Self {
            store,
            records,
            pipeline,
            layout,
            supervisor,
        }
    }

    /// Validates `request`, creates a queued job and schedules its run.
    ///
    /// Returns before any stage executes. Must be called within a tokio
    /// runtime.
    pub fn submit(&self, request: GenerationRequest) -> Result<Submission, MuseError> {
        request.validate()?;

        let plan = plan(&request.music_prompt, &request.genres, request.duration);
        let job_id = Uuid::new_v4().to_string();
        let job = self.store.create(&job_id);

        info!(
            job_id = %job_id,
            prompt = %sanitize::redact_prompt(&request.music_prompt),
            duration = request.duration,
            "Job submitted"
        );

        let assets = self.layout.for_job(&job_id, job.created_at);
        let ctx = PipelineContext::new(job_id.clone(), request, plan.clone(), assets);
        let progress = StoreProgress::new(Arc::clone(&self.store), job_id.clone());
        let pipeline = Arc::clone(&self.pipeline);

        let spawned = self.supervisor.spawn(&job_id, async move {
            // The outcome is already in the store through `progress`.
            let _ = pipeline.run(ctx, &progress).await;
        });
        if let Err(e) = spawned {
            self.store.delete(&job_id);
            return Err(e.into());
        }

        Ok(Submission { job_id, plan })
    }

    pub fn job(&self, id: &str) -> Option<Job> {
        self.store.get(id)
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn supervisor(&self) -> &Arc<JobSupervisor> {
        &self.supervisor
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }
}
