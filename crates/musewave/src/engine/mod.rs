//! Generation engine adapters.
//!
//! Each adapter wraps one external backend behind [`Engine`]: it either
//! produces an artifact or reports [`EngineOutput::Unavailable`] when the
//! backend is not installed. Errors are reserved for backends that are
//! present but fail while running.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EnginesConfig;
use crate::error::EngineError;
use crate::planner::Plan;

pub mod captions;
pub mod coqui;
pub mod dsp;
pub mod magenta;
pub mod mixer;
pub mod probe;
pub mod riffusion;
pub mod runner;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;

pub use coqui::CoquiEngine;
pub use dsp::DspEngine;
pub use magenta::MagentaEngine;
pub use mixer::Mixer;
pub use probe::{Capability, CapabilityProbe, CapabilitySnapshot};
pub use riffusion::RiffusionEngine;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use video::{VideoRenderer, VideoStyle};

/// Smallest file accepted as a real artifact.
pub const MIN_ARTIFACT_BYTES: u64 = 1;

/// Backend that produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Riffusion,
    Magenta,
    Coqui,
    Dsp,
    Ffmpeg,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Riffusion => "riffusion",
            EngineKind::Magenta => "magenta",
            EngineKind::Coqui => "coqui",
            EngineKind::Dsp => "dsp",
            EngineKind::Ffmpeg => "ffmpeg",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    Generated(PathBuf),
    Unavailable { reason: String },
}

impl EngineOutput {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        EngineOutput::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Inputs of the instrumental stage.
#[derive(Debug, Clone)]
pub struct InstrumentalInput {
    pub prompt: String,
    pub duration_secs: u32,
    pub seed: Option<u64>,
    pub plan: Plan,
}

/// Inputs of the melody stage.
#[derive(Debug, Clone)]
pub struct MelodyInput {
    pub duration_secs: u32,
    pub seed: Option<u64>,
    pub plan: Plan,
}

/// Inputs of the vocals stage.
#[derive(Debug, Clone)]
pub struct VocalsInput {
    pub lyrics: String,
    /// ISO-ish language code (`en`, `es`, ...), if the request named one.
    pub language: Option<String>,
    pub duration_secs: u32,
    pub plan: Plan,
}

/// One backend able to serve stage input `I`.
#[async_trait]
pub trait Engine<I: Sync>: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Generates into `output`. Returns `Unavailable` when the backend is
    /// not installed.
    async fn generate(&self, input: &I, output: &Path) -> Result<EngineOutput, EngineError>;
}

/// Fails with [`EngineError::MissingArtifact`] unless `path` is a non-empty file.
pub async fn ensure_artifact(path: &Path) -> Result<PathBuf, EngineError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() >= MIN_ARTIFACT_BYTES => Ok(path.to_path_buf()),
        _ => Err(EngineError::MissingArtifact(path.to_path_buf())),
    }
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// All adapters sharing one runner and one capability probe.
pub struct EngineSet {
    pub riffusion: RiffusionEngine,
    pub magenta: MagentaEngine,
    pub coqui: CoquiEngine,
    pub dsp: DspEngine,
    pub mixer: Mixer,
    pub video: VideoRenderer,
    probe: Arc<CapabilityProbe>,
}

impl EngineSet {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &EnginesConfig) -> Self {
        let probe = Arc::new(CapabilityProbe::new(
            Arc::clone(&runner),
            config.python_bin.clone(),
        ));

        Self {
            riffusion: RiffusionEngine::new(Arc::clone(&runner), Arc::clone(&probe), config),
            magenta: MagentaEngine::new(Arc::clone(&runner), Arc::clone(&probe), config),
            coqui: CoquiEngine::new(Arc::clone(&runner), Arc::clone(&probe), config),
            dsp: DspEngine::new(Arc::clone(&runner), config),
            mixer: Mixer::new(Arc::clone(&runner), config),
            video: VideoRenderer::new(Arc::clone(&runner), config),
            probe,
        }
    }

    pub fn probe(&self) -> &CapabilityProbe {
        &self.probe
    }

    /// Every capability any adapter may ask for.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        caps.extend(self.riffusion.capabilities());
        caps.extend(self.magenta.capabilities());
        caps.extend(self.coqui.capabilities());
        caps.extend(self.dsp.capabilities());

        let mut seen = std::collections::HashSet::new();
        caps.retain(|c| seen.insert(c.clone()));
        caps
    }

    /// Probes everything once, typically at startup.
    pub async fn detect(&self) -> CapabilitySnapshot {
        let caps = self.capabilities();
        let snapshot = self.probe.detect(&caps).await;
        tracing::info!(
            available = snapshot.capabilities.values().filter(|v| **v).count(),
            total = snapshot.capabilities.len(),
            "Engine capabilities detected"
        );
        snapshot
    }
}
