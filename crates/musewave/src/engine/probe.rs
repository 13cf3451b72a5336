//! Capability detection for external generators.
//!
//! Each capability is probed at most once per process and the answer is kept
//! forever. There is no invalidation: installing a tool while the server runs
//! requires a restart to be noticed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::engine::runner::{CommandRunner, CommandSpec};

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Something an engine needs in order to run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A Python module, probed with `python -c "import <module>"`.
    PythonModule(String),
    /// An executable, probed by running it with a version flag.
    Binary { program: String, version_arg: String },
}

impl Capability {
    pub fn module(name: &str) -> Self {
        Capability::PythonModule(name.to_string())
    }

    pub fn binary(program: &str, version_arg: &str) -> Self {
        Capability::Binary {
            program: program.to_string(),
            version_arg: version_arg.to_string(),
        }
    }

    /// Stable key used in the cache and in health snapshots.
    pub fn key(&self) -> String {
        match self {
            Capability::PythonModule(name) => format!("python:{}", name),
            Capability::Binary { program, .. } => format!("bin:{}", program),
        }
    }
}

/// Availability of every capability probed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    pub capabilities: BTreeMap<String, bool>,
}

impl CapabilitySnapshot {
    pub fn is_available(&self, capability: &Capability) -> Option<bool> {
        self.capabilities.get(&capability.key()).copied()
    }
}

/// Memoized capability prober.
pub struct CapabilityProbe {
    runner: Arc<dyn CommandRunner>,
    python_bin: String,
    cache: Mutex<HashMap<String, bool>>,
}

impl CapabilityProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, python_bin: impl Into<String>) -> Self {
        Self {
            runner,
            python_bin: python_bin.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<bool> {
        match self.cache.lock() {
            Ok(cache) => cache.get(key).copied(),
            Err(poisoned) => {
                log::warn!("Capability cache lock was poisoned, recovering");
                poisoned.into_inner().get(key).copied()
            }
        }
    }

    fn remember(&self, key: String, available: bool) {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.insert(key, available);
            }
            Err(poisoned) => {
                log::warn!("Capability cache lock was poisoned, recovering");
                poisoned.into_inner().insert(key, available);
            }
        }
    }

    fn spec_for(&self, capability: &Capability) -> CommandSpec {
        match capability {
            Capability::PythonModule(name) => CommandSpec::new(&self.python_bin, PROBE_TIMEOUT)
                .args(["-c".to_string(), format!("import {}", name)]),
            Capability::Binary {
                program,
                version_arg,
            } => CommandSpec::new(program, PROBE_TIMEOUT).arg(version_arg),
        }
    }

    /// Whether `capability` is present. Probes on first use, then answers
    /// from the cache.
    pub async fn is_available(&self, capability: &Capability) -> bool {
        let key = capability.key();
        if let Some(available) = self.cached(&key) {
            return available;
        }

        let spec = self.spec_for(capability);
        let available = match self.runner.run(&spec).await {
            Ok(output) => output.success(),
            Err(e) => {
                log::debug!("Probe for {} failed: {}", key, e);
                false
            }
        };

        if available {
            log::info!("Capability {} detected", key);
        } else {
            log::info!("Capability {} not available", key);
        }

        self.remember(key, available);
        available
    }

    /// Probes every capability up front and returns the resulting snapshot.
    pub async fn detect(&self, capabilities: &[Capability]) -> CapabilitySnapshot {
        for capability in capabilities {
            self.is_available(capability).await;
        }
        self.snapshot()
    }

    /// Everything probed so far.
    pub fn snapshot(&self) -> CapabilitySnapshot {
        let capabilities = match self.cache.lock() {
            Ok(cache) => cache.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            Err(poisoned) => {
                log::warn!("Capability cache lock was poisoned, recovering");
                poisoned
                    .into_inner()
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect()
            }
        };
        CapabilitySnapshot { capabilities }
    }
}
