use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::planner::Plan;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Terminal states are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

/// Pipeline stage a job is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Instrumental,
    Melody,
    Vocals,
    Mixing,
    Video,
    Finalizing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Planning => "planning",
            Stage::Instrumental => "instrumental",
            Stage::Melody => "melody",
            Stage::Vocals => "vocals",
            Stage::Mixing => "mixing",
            Stage::Video => "video",
            Stage::Finalizing => "finalizing",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result payload attached to a succeeded job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// Public URL of the mixed track.
    pub audio: String,
    /// Style slug to public video URL. Empty when no video was requested.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub videos: BTreeMap<String, String>,
    pub plan: Plan,
}

/// Tracked state of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            current_stage: None,
            result: None,
            error: None,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merges `update` into the job.
    ///
    /// Returns `false` without touching anything when the job is already
    /// terminal. Progress never decreases, a failure leaves progress where it
    /// was, and success forces it to 100.
    pub fn apply(&mut self, update: JobUpdate, now: DateTime<Utc>) -> bool {
        if self.is_finished() {
            return false;
        }

        let next_status = match update.status {
            // No way back to queued once processing has begun.
            Some(JobStatus::Queued) if self.status != JobStatus::Queued => self.status,
            Some(status) => status,
            None => self.status,
        };

        match next_status {
            JobStatus::Succeeded => self.progress = 100,
            JobStatus::Failed => {}
            JobStatus::Queued | JobStatus::Processing => {
                if let Some(progress) = update.progress {
                    self.progress = self.progress.max(progress.min(100));
                }
            }
        }

        self.status = next_status;

        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(stage) = update.stage {
            self.current_stage = Some(stage);
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }

        if self.status.is_terminal() {
            self.completed_at = Some(now);
        }

        true
    }

    /// Public URL of the mixed track, once the job has succeeded.
    pub fn audio_url(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.audio.as_str())
    }

    /// Video URLs by style slug; `None` when the job rendered no video.
    pub fn video_urls(&self) -> Option<&BTreeMap<String, String>> {
        self.result
            .as_ref()
            .map(|r| &r.videos)
            .filter(|videos| !videos.is_empty())
    }
}

/// Partial update merged into a [`Job`] by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub stage: Option<Stage>,
    pub result: Option<JobOutcome>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn result(mut self, result: JobOutcome) -> Self {
        self.result = Some(result);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// A progress-only step while processing.
    pub fn processing(stage: Stage, progress: u8, message: impl Into<String>) -> Self {
        Self::new()
            .status(JobStatus::Processing)
            .stage(stage)
            .progress(progress)
            .message(message)
    }

    pub fn succeeded(result: JobOutcome) -> Self {
        Self::new()
            .status(JobStatus::Succeeded)
            .progress(100)
            .message("Generation complete")
            .result(result)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new()
            .status(JobStatus::Failed)
            .message(format!("Generation failed: {}", error))
            .error(error)
    }
}

/// Status document returned to polling clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_urls: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            current_stage: job.current_stage,
            audio_url: job.audio_url().map(str::to_string),
            video_urls: job.video_urls().cloned(),
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }
}
