//! Text-to-speech vocals through the Coqui `tts` CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EnginesConfig;
use crate::engine::probe::{Capability, CapabilityProbe};
use crate::engine::runner::{CommandRunner, CommandSpec};
use crate::engine::{ensure_artifact, path_arg, Engine, EngineKind, EngineOutput, VocalsInput};
use crate::error::EngineError;

const MODULE: &str = "TTS";

pub struct CoquiEngine {
    runner: Arc<dyn CommandRunner>,
    probe: Arc<CapabilityProbe>,
    tts_bin: String,
    timeout: Duration,
}

impl CoquiEngine {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Arc<CapabilityProbe>,
        config: &EnginesConfig,
    ) -> Self {
        Self {
            runner,
            probe,
            tts_bin: config.tts_bin.clone(),
            timeout: config.command_timeout(),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::module(MODULE),
            Capability::binary(&self.tts_bin, "--help"),
        ]
    }

    fn command(&self, input: &VocalsInput, output: &Path) -> CommandSpec {
        let text = input
            .lyrics
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(". ");

        let mut spec = CommandSpec::new(&self.tts_bin, self.timeout)
            .arg(format!("--text={}", text))
            .arg("--out_path")
            .arg(path_arg(output));
        if let Some(language) = input.language.as_deref() {
            spec = spec.arg("--language_idx").arg(language);
        }
        spec
    }
}

#[async_trait]
impl Engine<VocalsInput> for CoquiEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Coqui
    }

    async fn generate(&self, input: &VocalsInput, output: &Path) -> Result<EngineOutput, EngineError> {
        if !self.probe.is_available(&Capability::module(MODULE)).await {
            return Ok(EngineOutput::unavailable("python module 'TTS' not installed"));
        }
        if !self
            .probe
            .is_available(&Capability::binary(&self.tts_bin, "--help"))
            .await
        {
            return Ok(EngineOutput::unavailable(format!(
                "'{}' not installed",
                self.tts_bin
            )));
        }

        self.runner.run_checked(&self.command(input, output)).await?;
        let path = ensure_artifact(output).await?;
        Ok(EngineOutput::Generated(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::ScriptedRunner;
    use crate::planner::plan;

    fn input(language: Option<&str>) -> VocalsInput {
        VocalsInput {
            lyrics: "hello world\n\nsecond line".to_string(),
            language: language.map(str::to_string),
            duration_secs: 30,
            plan: plan("test", &[], 30),
        }
    }

    fn engine(runner: Arc<ScriptedRunner>) -> CoquiEngine {
        let probe = Arc::new(CapabilityProbe::new(runner.clone(), "python3"));
        CoquiEngine::new(runner, probe, &EnginesConfig::default())
    }

    #[tokio::test]
    async fn test_unavailable_when_module_missing() {
        let runner = Arc::new(ScriptedRunner::new().missing("TTS"));
        let dir = tempfile::tempdir().unwrap();
        let result = engine(runner)
            .generate(&input(None), &dir.path().join("vocals.wav"))
            .await
            .unwrap();
        assert!(matches!(result, EngineOutput::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_when_cli_missing() {
        let runner = Arc::new(ScriptedRunner::new().missing("tts"));
        let dir = tempfile::tempdir().unwrap();
        let result = engine(runner)
            .generate(&input(None), &dir.path().join("vocals.wav"))
            .await
            .unwrap();
        assert!(matches!(result, EngineOutput::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_synthesizes_lyrics() {
        let runner = Arc::new(ScriptedRunner::new());
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("vocals.wav");

        let result = engine(runner.clone())
            .generate(&input(Some("en")), &output)
            .await
            .unwrap();
        assert_eq!(result, EngineOutput::Generated(output));

        let call = runner.calls_to("tts").pop().unwrap();
        assert!(call
            .args
            .contains(&"--text=hello world. second line".to_string()));
        assert_eq!(call.arg_after("--language_idx"), Some("en"));
    }

    #[tokio::test]
    async fn test_dash_lyrics_stay_one_argument() {
        let runner = Arc::new(ScriptedRunner::new());
        let dir = tempfile::tempdir().unwrap();
        let mut input = input(None);
        input.lyrics = "-oh".to_string();

        engine(runner.clone())
            .generate(&input, &dir.path().join("vocals.wav"))
            .await
            .unwrap();

        let call = runner.calls_to("tts").pop().unwrap();
        assert_eq!(call.args[0], "--text=-oh");
        assert!(!call.args.iter().any(|a| a == "-oh"));
    }
}
