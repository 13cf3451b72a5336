//! Scripted command runner for engine and pipeline unit tests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::EngineError;

/// Pretends to be every external tool.
///
/// Probes for modules or programs listed as missing fail; every other
/// command writes a few bytes to the output path it names and exits 0.
#[derive(Default)]
pub struct ScriptedRunner {
    missing: HashSet<String>,
    failing_programs: HashSet<String>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a Python module or a program as not installed.
    pub fn missing(mut self, name: &str) -> Self {
        self.missing.insert(name.to_string());
        self
    }

    /// Makes every non-probe invocation of `program` exit with code 1.
    pub fn failing(mut self, program: &str) -> Self {
        self.failing_programs.insert(program.to_string());
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

    fn output_path(spec: &CommandSpec) -> Option<PathBuf> {
        if let Some(dir) = spec.arg_after("--output_dir") {
            return Some(PathBuf::from(dir).join("melody_1.mid"));
        }
        for flag in ["--output", "--out_path", "-F"] {
            if let Some(path) = spec.arg_after(flag) {
                return Some(PathBuf::from(path));
            }
        }
        spec.args
            .last()
            .filter(|a| a.contains('.') && !a.starts_with('-'))
            .map(PathBuf::from)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
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
            let code = if self.missing.contains(module) { 1 } else { 0 };
            return Ok(CommandOutput {
                code: Some(code),
                ..Default::default()
            });
        }

        let is_probe = spec.args.len() == 1 && spec.args[0].starts_with('-');
        if !is_probe && self.failing_programs.contains(&spec.program) {
            return Ok(CommandOutput {
                code: Some(1),
                stderr: format!("{} failed", spec.program),
                ..Default::default()
            });
        }

        if let Some(path) = Self::output_path(spec) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, b"RIFF-fake-artifact").unwrap();
        }

        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}
