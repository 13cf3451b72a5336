//! Mastering of all stems into one track.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EnginesConfig;
use crate::engine::runner::{CommandRunner, CommandSpec};
use crate::engine::{ensure_artifact, path_arg};
use crate::error::EngineError;

/// Integrated loudness target in LUFS.
pub const LOUDNESS_TARGET: f64 = -14.0;
pub const TRUE_PEAK: f64 = -1.5;
pub const LOUDNESS_RANGE: f64 = 11.0;

pub struct Mixer {
    runner: Arc<dyn CommandRunner>,
    ffmpeg_bin: String,
    sample_rate: u32,
    timeout: Duration,
}

impl Mixer {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &EnginesConfig) -> Self {
        Self {
            runner,
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            sample_rate: config.sample_rate,
            timeout: config.command_timeout(),
        }
    }

    /// amix -> alimiter -> dynaudnorm -> loudnorm, in that order.
    pub fn filter_chain(stems: usize) -> String {
        format!(
            "amix=inputs={}:normalize=0,alimiter=limit=0.95,dynaudnorm,loudnorm=I={}:TP={}:LRA={}",
            stems, LOUDNESS_TARGET, TRUE_PEAK, LOUDNESS_RANGE
        )
    }

    fn command(&self, stems: &[PathBuf], output: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.ffmpeg_bin, self.timeout).arg("-y");
        for stem in stems {
            spec = spec.arg("-i").arg(path_arg(stem));
        }
        spec.arg("-filter_complex")
            .arg(Self::filter_chain(stems.len()))
            .arg("-ar")
            .arg(self.sample_rate.to_string())
            .args(["-ac", "2"])
            .arg(path_arg(output))
    }

    /// Mixes `stems` into `output`. Fewer than two stems is a caller bug.
    pub async fn mix(&self, stems: &[PathBuf], output: &Path) -> Result<PathBuf, EngineError> {
        if stems.len() < 2 {
            return Err(EngineError::NotEnoughStems(stems.len()));
        }

        tracing::debug!(stems = stems.len(), "Mixing stems");
        self.runner
            .run_checked(&self.command(stems, output))
            .await?;
        ensure_artifact(output).await
    }
}
