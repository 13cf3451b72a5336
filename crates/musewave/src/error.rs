use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Validation failed: {0}")]
    Validation(#[from] crate::pipeline::ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Record store error: {0}")]
    Records(#[from] crate::records::RecordError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path '{0}' is outside the assets directory")]
    OutsideAssets(PathBuf),
}

/// Hard failures raised while an engine is running.
///
/// An engine that is simply not installed never produces one of these; it
/// answers with [`crate::engine::EngineOutput::Unavailable`] instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Mixing needs at least two stems, got {0}")]
    NotEnoughStems(usize),

    #[error("Expected artifact was not produced: {0}")]
    MissingArtifact(PathBuf),

    #[error("Engine I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Supervisor is shutting down, not accepting job '{0}'")]
    ShuttingDown(String),
}

pub type Result<T> = std::result::Result<T, MuseError>;
