//! Fake external tools.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use musewave::engine::{CommandOutput, CommandRunner, CommandSpec};
use musewave::EngineError;

/// Answers capability probes and writes a small artifact wherever a
/// command says its output goes.
#[derive(Default)]
pub struct FakeToolchain {
    missing: HashSet<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a Python module or an executable as not installed.
    pub fn without(mut self, name: &str) -> Self {
        self.missing.insert(name.to_string());
        self
    }

    /// Makes every real invocation of `program` exit with status 1.
    pub fn broken(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    /// The mastering invocation, if one ran.
    pub fn mix_call(&self) -> Option<CommandSpec> {
        self.calls_to("ffmpeg").into_iter().find(|c| {
            c.arg_after("-filter_complex")
                .is_some_and(|f| f.starts_with("amix") && f.contains("loudnorm"))
        })
    }

    fn output_of(spec: &CommandSpec) -> Option<PathBuf> {
        if let Some(dir) = spec.arg_after("--output_dir") {
            return Some(PathBuf::from(dir).join("generated.mid"));
        }
        ["--output", "--out_path", "-F"]
            .iter()
            .find_map(|flag| spec.arg_after(flag))
            .map(PathBuf::from)
            .or_else(|| {
                spec.args
                    .last()
                    .filter(|a| !a.starts_with('-') && a.contains('.'))
                    .map(PathBuf::from)
            })
    }
}

#[async_trait]
impl CommandRunner for FakeToolchain {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, EngineError> {
        self.calls.lock().unwrap().push(spec.clone());

        if self.missing.contains(&spec.program) {
            return Err(EngineError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        if let Some(statement) = spec.arg_after("-c") {
            let module = statement.trim_start_matches("import ").trim();
            return Ok(CommandOutput {
                code: Some(if self.missing.contains(module) { 1 } else { 0 }),
                ..Default::default()
            });
        }

        let probe = spec.args.len() == 1;
        if !probe && self.failing.contains(&spec.program) {
            return Ok(CommandOutput {
                code: Some(1),
                stderr: format!("{}: simulated failure", spec.program),
                ..Default::default()
            });
        }

        if let Some(path) = Self::output_of(spec) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, b"RIFF....WAVEfmt fake").unwrap();
        }

        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}
