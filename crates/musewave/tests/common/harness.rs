//! Isolated orchestrator for integration tests.
//!
//! The `TestHarness` owns a temp directory holding the assets tree, a
//! soundfont and a melody model bundle, plus an in-memory SQLite record
//! store, and wires them into an `Orchestrator` driven by a `FakeToolchain`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use musewave::config::EnginesConfig;
use musewave::db::Database;
use musewave::jobs::{InMemoryJobStore, Job, JobStore};
use musewave::{
    AssetLayout, EngineSet, GenerationRecord, GenerationRequest, JobSupervisor, Orchestrator,
    RecordStore, SqliteRecordStore, Submission,
};

use super::toolchain::FakeToolchain;

pub struct TestHarness {
    temp_dir: TempDir,
    pub assets_dir: PathBuf,
    pub toolchain: Arc<FakeToolchain>,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// Every tool installed.
    pub fn new() -> Self {
        Self::with_toolchain(FakeToolchain::new())
    }

    pub fn with_toolchain(toolchain: FakeToolchain) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let assets_dir = base.join("assets");
        let soundfont = base.join("GeneralUser.sf2");
        let bundle = base.join("attention_rnn.mag");
        std::fs::write(&soundfont, b"sf2").unwrap();
        std::fs::write(&bundle, b"mag").unwrap();

        let engines_config = EnginesConfig {
            soundfont_path: soundfont,
            magenta_bundle_path: bundle,
            ..EnginesConfig::default()
        };

        let toolchain = Arc::new(toolchain);
        let engines = Arc::new(EngineSet::new(toolchain.clone(), &engines_config));
        let records: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(
            Database::open_in_memory().expect("Failed to open database"),
        ));
        let store: Arc<dyn JobStore> =
            Arc::new(InMemoryJobStore::new(Duration::from_secs(3600)));

        let orchestrator = Orchestrator::new(
            store,
            records,
            engines,
            AssetLayout::new(&assets_dir, "/assets"),
            Arc::new(JobSupervisor::new(None)),
        );

        Self {
            temp_dir,
            assets_dir,
            toolchain,
            orchestrator,
        }
    }

    pub fn submit(&self, request: GenerationRequest) -> Submission {
        self.orchestrator
            .submit(request)
            .expect("request should be accepted")
    }

    /// Polls the job until it is terminal, recording every observed state.
    pub async fn poll_until_finished(&self, job_id: &str) -> Vec<Job> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = Vec::new();

        loop {
            let job = self
                .orchestrator
                .job(job_id)
                .expect("job should stay in the store while polling");
            let finished = job.is_finished();
            seen.push(job);
            if finished {
                return seen;
            }
            assert!(Instant::now() < deadline, "job {} never finished", job_id);
            tokio::task::yield_now().await;
        }
    }

    pub fn record(&self, job_id: &str) -> Option<GenerationRecord> {
        self.orchestrator.records().find(job_id).unwrap()
    }

    /// Turns a public asset URL back into a path under the temp directory.
    pub fn asset_path(&self, url: &str) -> PathBuf {
        let relative = url
            .strip_prefix("/assets/")
            .expect("asset url should use the /assets prefix");
        self.assets_dir.join(relative)
    }
}
