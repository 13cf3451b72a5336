//! Deterministic synthesis through ffmpeg's `lavfi` sources.
//!
//! This is the fallback that is always there: as long as ffmpeg runs, the
//! instrumental and vocal stages produce something audible, shaped by the
//! plan's tonic and tempo.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EnginesConfig;
use crate::engine::probe::Capability;
use crate::engine::runner::{CommandRunner, CommandSpec};
use crate::engine::{
    ensure_artifact, path_arg, Engine, EngineKind, EngineOutput, InstrumentalInput, VocalsInput,
};
use crate::error::EngineError;
use crate::planner::Plan;

const FADE_SECS: u32 = 2;
const NOISE_AMPLITUDE: f64 = 0.05;

pub struct DspEngine {
    runner: Arc<dyn CommandRunner>,
    ffmpeg_bin: String,
    sample_rate: u32,
    timeout: Duration,
}

impl DspEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &EnginesConfig) -> Self {
        Self {
            runner,
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            sample_rate: config.sample_rate,
            timeout: config.command_timeout(),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::binary(&self.ffmpeg_bin, "-version")]
    }

    /// Renders `sources` (lavfi source descriptions) through `filter` into
    /// `output`. The filter receives every source as `[N:a]`.
    fn command(&self, sources: &[String], filter: &str, output: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.ffmpeg_bin, self.timeout).arg("-y");
        for source in sources {
            spec = spec.args(["-f", "lavfi", "-i"]).arg(source.as_str());
        }
        spec.arg("-filter_complex")
            .arg(filter)
            .arg("-ar")
            .arg(self.sample_rate.to_string())
            .args(["-ac", "2"])
            .arg(path_arg(output))
    }

    async fn render(
        &self,
        sources: &[String],
        filter: &str,
        output: &Path,
    ) -> Result<PathBuf, EngineError> {
        self.runner
            .run_checked(&self.command(sources, filter, output))
            .await?;
        ensure_artifact(output).await
    }

    /// Pad of tonic overtones with a slow tremolo. Used as the extra stem
    /// when fewer than two stems exist before mixing.
    pub async fn texture(
        &self,
        plan: &Plan,
        duration_secs: u32,
        output: &Path,
    ) -> Result<PathBuf, EngineError> {
        let tonic = plan.tonic_hz();
        let sources = vec![
            sine(tonic * 2.0, duration_secs),
            sine(tonic * 3.0, duration_secs),
            sine(tonic * 4.0, duration_secs),
        ];
        let beat_hz = f64::from(plan.bpm) / 60.0;
        let filter = format!(
            "{},volume=0.2,tremolo=f={:.2}:d=0.6{}",
            mix_inputs(sources.len()),
            beat_hz,
            fades(duration_secs)
        );
        self.render(&sources, &filter, output).await
    }
}

fn sine(frequency: f64, duration_secs: u32) -> String {
    format!("sine=frequency={:.2}:duration={}", frequency, duration_secs)
}

fn mix_inputs(count: usize) -> String {
    let labels: String = (0..count).map(|i| format!("[{}:a]", i)).collect();
    format!("{}amix=inputs={}:normalize=0", labels, count)
}

fn fades(duration_secs: u32) -> String {
    if duration_secs <= FADE_SECS * 2 {
        return String::new();
    }
    format!(
        ",afade=t=in:d={fade},afade=t=out:st={start}:d={fade}",
        fade = FADE_SECS,
        start = duration_secs - FADE_SECS
    )
}

/// Syllable-ish pulses per second for the fallback vocal line.
fn word_rate(lyrics: &str, duration_secs: u32) -> f64 {
    let words = lyrics.split_whitespace().count().max(1) as f64;
    let secs = f64::from(duration_secs.max(1));
    (words / secs).clamp(0.5, 8.0)
}

#[async_trait]
impl Engine<InstrumentalInput> for DspEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Dsp
    }

    async fn generate(
        &self,
        input: &InstrumentalInput,
        output: &Path,
    ) -> Result<EngineOutput, EngineError> {
        let tonic = input.plan.tonic_hz();
        let noise_seed = input.seed.unwrap_or(0) % u64::from(u32::MAX);
        let sources = vec![
            sine(tonic, input.duration_secs),
            sine(tonic * 1.5, input.duration_secs),
            format!(
                "anoisesrc=color=pink:amplitude={}:seed={}:duration={}",
                NOISE_AMPLITUDE, noise_seed, input.duration_secs
            ),
        ];
        let filter = format!(
            "{},volume=0.3{}",
            mix_inputs(sources.len()),
            fades(input.duration_secs)
        );

        let path = self.render(&sources, &filter, output).await?;
        Ok(EngineOutput::Generated(path))
    }
}

#[async_trait]
impl Engine<VocalsInput> for DspEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Dsp
    }

    async fn generate(&self, input: &VocalsInput, output: &Path) -> Result<EngineOutput, EngineError> {
        let sources = vec![sine(input.plan.tonic_hz() * 2.0, input.duration_secs)];
        let filter = format!(
            "[0:a]vibrato=f=5:d=0.4,tremolo=f={:.2}:d=0.8,volume=0.25{}",
            word_rate(&input.lyrics, input.duration_secs),
            fades(input.duration_secs)
        );

        let path = self.render(&sources, &filter, output).await?;
        Ok(EngineOutput::Generated(path))
    }
}
