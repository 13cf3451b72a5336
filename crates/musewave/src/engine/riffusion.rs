//! Text-to-music diffusion through the `riffusion` Python package.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EnginesConfig;
use crate::engine::probe::{Capability, CapabilityProbe};
use crate::engine::runner::{CommandRunner, CommandSpec};
use crate::engine::{ensure_artifact, path_arg, Engine, EngineKind, EngineOutput, InstrumentalInput};
use crate::error::EngineError;

const MODULE: &str = "riffusion";

pub struct RiffusionEngine {
    runner: Arc<dyn CommandRunner>,
    probe: Arc<CapabilityProbe>,
    python_bin: String,
    timeout: Duration,
}

impl RiffusionEngine {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Arc<CapabilityProbe>,
        config: &EnginesConfig,
    ) -> Self {
        Self {
            runner,
            probe,
            python_bin: config.python_bin.clone(),
            timeout: config.command_timeout(),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::module(MODULE)]
    }

    fn command(&self, input: &InstrumentalInput, output: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.python_bin, self.timeout)
            .args(["-m", "riffusion.cli"])
            // Joined so a prompt starting with '-' is not read as a flag.
            .arg(format!("--prompt={}", input.prompt))
            .arg("--duration")
            .arg(input.duration_secs.to_string())
            .arg("--output")
            .arg(path_arg(output));
        if let Some(seed) = input.seed {
            spec = spec.arg("--seed").arg(seed.to_string());
        }
        spec
    }
}

#[async_trait]
impl Engine<InstrumentalInput> for RiffusionEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Riffusion
    }

    async fn generate(
        &self,
        input: &InstrumentalInput,
        output: &Path,
    ) -> Result<EngineOutput, EngineError> {
        if !self.probe.is_available(&Capability::module(MODULE)).await {
            return Ok(EngineOutput::unavailable("python module 'riffusion' not installed"));
        }

        self.runner.run_checked(&self.command(input, output)).await?;
        let path = ensure_artifact(output).await?;
        Ok(EngineOutput::Generated(path))
    }
}
