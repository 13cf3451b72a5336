//! Append-only log of completed generations.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{RecordStoreKind, RecordsConfig};
use crate::db::{Database, DatabaseError};
use crate::engine::EngineKind;
use crate::jobs::Stage;

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileRecordStore;
pub use sqlite::SqliteRecordStore;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Generation record '{0}' already exists")]
    Duplicate(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Record file I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored record '{id}' is malformed: {message}")]
    Malformed { id: String, message: String },

    #[error("Record store lock poisoned")]
    LockPoisoned,
}

/// Persisted summary of one succeeded job. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    /// The original request body.
    pub request: serde_json::Value,
    pub bpm: u32,
    pub key: String,
    pub mix_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumental_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melody_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocals_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub video_urls: BTreeMap<String, String>,
    /// Which engine produced each stage.
    pub engines: BTreeMap<Stage, EngineKind>,
    pub created_at: DateTime<Utc>,
}

/// Write-once storage of generation records.
pub trait RecordStore: Send + Sync {
    /// Persists a record. A second insert with the same id is an error.
    fn insert(&self, record: &GenerationRecord) -> Result<(), RecordError>;

    fn find(&self, id: &str) -> Result<Option<GenerationRecord>, RecordError>;

    /// Most recent records first.
    fn list(&self, limit: usize) -> Result<Vec<GenerationRecord>, RecordError>;
}

/// Opens the record store selected by the config.
pub fn open_record_store(config: &RecordsConfig) -> Result<Arc<dyn RecordStore>, RecordError> {
    let path = config.resolved_path();
    match config.kind {
        RecordStoreKind::Sqlite => {
            let db = Database::open(&path)?;
            Ok(Arc::new(SqliteRecordStore::new(db)))
        }
        RecordStoreKind::Json => Ok(Arc::new(JsonFileRecordStore::new(path))),
    }
}
