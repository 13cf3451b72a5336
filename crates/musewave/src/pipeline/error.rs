use thiserror::Error;

use crate::jobs::Stage;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Engine {
        stage: Stage,
        #[source]
        source: crate::error::EngineError,
    },

    #[error("No engine available for the {stage} stage")]
    NoEngine { stage: Stage },

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Failed to persist generation record: {0}")]
    Record(#[from] crate::records::RecordError),

    #[error("Record write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Failed to encode request: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn engine(stage: Stage, source: crate::error::EngineError) -> Self {
        PipelineError::Engine { stage, source }
    }
}
