//! Melody generation with Magenta's melody RNN, rendered to audio by
//! FluidSynth.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EnginesConfig;
use crate::engine::probe::{Capability, CapabilityProbe};
use crate::engine::runner::{CommandRunner, CommandSpec};
use crate::engine::{ensure_artifact, path_arg, Engine, EngineKind, EngineOutput, MelodyInput};
use crate::error::EngineError;

const MODULE: &str = "magenta";
const STEPS_PER_BEAT: f64 = 4.0;

pub struct MagentaEngine {
    runner: Arc<dyn CommandRunner>,
    probe: Arc<CapabilityProbe>,
    python_bin: String,
    fluidsynth_bin: String,
    soundfont: PathBuf,
    bundle: PathBuf,
    sample_rate: u32,
    timeout: Duration,
}

impl MagentaEngine {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Arc<CapabilityProbe>,
        config: &EnginesConfig,
    ) -> Self {
        Self {
            runner,
            probe,
            python_bin: config.python_bin.clone(),
            fluidsynth_bin: config.fluidsynth_bin.clone(),
            soundfont: config.soundfont_path.clone(),
            bundle: config.magenta_bundle_path.clone(),
            sample_rate: config.sample_rate,
            timeout: config.command_timeout(),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::module(MODULE),
            Capability::binary(&self.fluidsynth_bin, "--version"),
        ]
    }

    /// Reason the engine cannot run, if any.
    async fn missing_requirement(&self) -> Option<String> {
        if !self.probe.is_available(&Capability::module(MODULE)).await {
            return Some("python module 'magenta' not installed".to_string());
        }
        if !file_exists(&self.bundle).await {
            return Some(format!("model bundle {} not found", self.bundle.display()));
        }
        let fluidsynth = Capability::binary(&self.fluidsynth_bin, "--version");
        if !self.probe.is_available(&fluidsynth).await {
            return Some(format!("'{}' not installed", self.fluidsynth_bin));
        }
        if !file_exists(&self.soundfont).await {
            return Some(format!("soundfont {} not found", self.soundfont.display()));
        }
        None
    }

    fn generate_command(&self, input: &MelodyInput, output_dir: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.python_bin, self.timeout)
            .args(["-m", "magenta.models.melody_rnn.melody_rnn_generate"])
            .arg("--config=attention_rnn")
            .arg(format!("--bundle_file={}", self.bundle.display()))
            .arg("--output_dir")
            .arg(path_arg(output_dir))
            .arg("--num_outputs=1")
            .arg(format!("--num_steps={}", num_steps(input)))
            .arg(format!("--qpm={}", input.plan.bpm))
            .arg(format!("--primer_melody=[{}]", tonic_midi_note(input.plan.tonic_hz())));
        if let Some(seed) = input.seed {
            spec = spec.arg(format!("--seed={}", seed));
        }
        spec
    }

    fn render_command(&self, midi: &Path, wav: &Path) -> CommandSpec {
        CommandSpec::new(&self.fluidsynth_bin, self.timeout)
            .arg("-ni")
            .arg(path_arg(&self.soundfont))
            .arg(path_arg(midi))
            .arg("-F")
            .arg(path_arg(wav))
            .arg("-r")
            .arg(self.sample_rate.to_string())
    }
}

/// Sixteenth-note steps covering the requested duration.
fn num_steps(input: &MelodyInput) -> u32 {
    let beats = f64::from(input.duration_secs) * f64::from(input.plan.bpm) / 60.0;
    (beats * STEPS_PER_BEAT).ceil() as u32
}

fn tonic_midi_note(hz: f64) -> i32 {
    (69.0 + 12.0 * (hz / 440.0).log2()).round() as i32
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// First `.mid` file written into `dir`.
async fn find_midi(dir: &Path) -> Result<PathBuf, EngineError> {
    let io = |e: std::io::Error| EngineError::Io {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io)?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("mid") {
            found.push(path);
        }
    }
    found.sort();
    found
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::MissingArtifact(dir.join("*.mid")))
}

#[async_trait]
impl Engine<MelodyInput> for MagentaEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Magenta
    }

    /// Writes `melody.mid` next to `output` and renders it to `output`.
    async fn generate(&self, input: &MelodyInput, output: &Path) -> Result<EngineOutput, EngineError> {
        if let Some(reason) = self.missing_requirement().await {
            return Ok(EngineOutput::unavailable(reason));
        }

        let job_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let scratch = job_dir.join("magenta");
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|e| EngineError::Io {
                path: scratch.clone(),
                source: e,
            })?;

        self.runner
            .run_checked(&self.generate_command(input, &scratch))
            .await?;

        let generated = find_midi(&scratch).await?;
        let midi = output.with_extension("mid");
        tokio::fs::rename(&generated, &midi)
            .await
            .map_err(|e| EngineError::Io {
                path: generated.clone(),
                source: e,
            })?;
        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            log::debug!("Could not remove {}: {}", scratch.display(), e);
        }

        self.runner
            .run_checked(&self.render_command(&midi, output))
            .await?;
        let path = ensure_artifact(output).await?;
        Ok(EngineOutput::Generated(path))
    }
}
