pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod pipeline;
pub mod planner;
pub mod records;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use config::{load_config, load_config_from_str, Config};
pub use engine::{CapabilityProbe, CommandRunner, EngineOutput, EngineSet, ProcessRunner};
pub use error::{ConfigError, EngineError, MuseError, Result, StorageError};
pub use jobs::{InMemoryJobStore, Job, JobStatus, JobStore, JobSweeper, JobUpdate, Stage};
pub use pipeline::{GenerationRequest, Orchestrator, Submission, ValidationErrors};
pub use planner::{plan, Plan};
pub use records::{GenerationRecord, JsonFileRecordStore, RecordStore, SqliteRecordStore};
pub use storage::AssetLayout;
pub use worker::JobSupervisor;
