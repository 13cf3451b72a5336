use std::sync::Arc;

use crate::jobs::{JobOutcome, JobStore, JobUpdate, Stage};

/// Events emitted by the pipeline while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Stage {
        stage: Stage,
        progress: u8,
        message: String,
    },
    Completed {
        outcome: JobOutcome,
    },
    Failed {
        error: String,
    },
}

impl ProgressEvent {
    pub fn stage(stage: Stage, progress: u8, message: impl Into<String>) -> Self {
        ProgressEvent::Stage {
            stage,
            progress,
            message: message.into(),
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Writes pipeline events into the job store.
pub struct StoreProgress {
    store: Arc<dyn JobStore>,
    job_id: String,
}

impl StoreProgress {
    pub fn new(store: Arc<dyn JobStore>, job_id: impl Into<String>) -> Self {
        Self {
            store,
            job_id: job_id.into(),
        }
    }
}

impl ProgressReporter for StoreProgress {
    fn report(&self, event: ProgressEvent) {
        let update = match event {
            ProgressEvent::Stage {
                stage,
                progress,
                message,
            } => JobUpdate::processing(stage, progress, message),
            ProgressEvent::Completed { outcome } => JobUpdate::succeeded(outcome),
            ProgressEvent::Failed { error } => JobUpdate::failed(error),
        };

        // A miss is already logged by the store; the run carries on.
        let _ = self.store.update(&self.job_id, update);
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every event for later assertions.
    #[derive(Default)]
    pub struct RecordingProgress {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingProgress {
        pub fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn stages(&self) -> Vec<(Stage, u8)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    ProgressEvent::Stage {
                        stage, progress, ..
                    } => Some((stage, progress)),
                    _ => None,
                })
                .collect()
        }
    }

    impl ProgressReporter for RecordingProgress {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
