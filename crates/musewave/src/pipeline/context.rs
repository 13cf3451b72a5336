use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::engine::{EngineKind, VideoStyle};
use crate::jobs::Stage;
use crate::planner::Plan;
use crate::storage::JobAssets;

use super::request::GenerationRequest;

pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub request: GenerationRequest,
    pub plan: Plan,
    pub assets: JobAssets,

    // Instrumental stage, always set once it completes
    pub instrumental: Option<PathBuf>,

    // Optional stems
    pub melody: Option<PathBuf>,
    pub vocals: Option<PathBuf>,
    pub captions: Option<PathBuf>,

    // Filler stem added when fewer than two stems exist
    pub texture: Option<PathBuf>,

    pub mix: Option<PathBuf>,
    pub videos: BTreeMap<VideoStyle, PathBuf>,

    /// Engine that satisfied each stage.
    pub engines: BTreeMap<Stage, EngineKind>,
}

impl PipelineContext {
    pub fn new(
        job_id: impl Into<String>,
        request: GenerationRequest,
        plan: Plan,
        assets: JobAssets,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            request,
            plan,
            assets,
            instrumental: None,
            melody: None,
            vocals: None,
            captions: None,
            texture: None,
            mix: None,
            videos: BTreeMap::new(),
            engines: BTreeMap::new(),
        }
    }

    /// Every audio layer produced so far, in mix order.
    pub fn stems(&self) -> Vec<PathBuf> {
        [
            &self.instrumental,
            &self.melody,
            &self.vocals,
            &self.texture,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}
