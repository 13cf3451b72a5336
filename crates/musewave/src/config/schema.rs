use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_assets_directory")]
    pub assets_directory: PathBuf,
    #[serde(default = "default_public_url_prefix")]
    pub public_url_prefix: String,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub engines: EnginesConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            assets_directory: default_assets_directory(),
            public_url_prefix: default_public_url_prefix(),
            records: RecordsConfig::default(),
            engines: EnginesConfig::default(),
            jobs: JobsConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Returns the base data directory: `~/.musewave`, or `./.musewave` when no
/// home directory can be resolved.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".musewave"))
        .unwrap_or_else(|| PathBuf::from(".musewave"))
}

fn default_assets_directory() -> PathBuf {
    default_data_dir().join("assets")
}

fn default_public_url_prefix() -> String {
    "/assets".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStoreKind {
    #[default]
    Sqlite,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    #[serde(default)]
    pub kind: RecordStoreKind,
    /// Database file for `sqlite`, JSON Lines file for `json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl RecordsConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match (&self.path, self.kind) {
            (Some(path), _) => path.clone(),
            (None, RecordStoreKind::Sqlite) => default_data_dir().join("data").join("musewave.db"),
            (None, RecordStoreKind::Json) => {
                default_data_dir().join("data").join("generations.jsonl")
            }
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            kind: RecordStoreKind::Sqlite,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginesConfig {
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    #[serde(default = "default_fluidsynth_bin")]
    pub fluidsynth_bin: String,
    #[serde(default = "default_tts_bin")]
    pub tts_bin: String,
    #[serde(default = "default_soundfont_path")]
    pub soundfont_path: PathBuf,
    #[serde(default = "default_magenta_bundle_path")]
    pub magenta_bundle_path: PathBuf,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl EnginesConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_fluidsynth_bin() -> String {
    "fluidsynth".to_string()
}

fn default_tts_bin() -> String {
    "tts".to_string()
}

fn default_soundfont_path() -> PathBuf {
    PathBuf::from("/usr/local/share/soundfonts/GeneralUser.sf2")
}

fn default_magenta_bundle_path() -> PathBuf {
    PathBuf::from("/usr/local/share/magenta_models/attention_rnn.mag")
}

fn default_command_timeout_secs() -> u64 {
    600
}

fn default_sample_rate() -> u32 {
    44_100
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            python_bin: default_python_bin(),
            ffmpeg_bin: default_ffmpeg_bin(),
            fluidsynth_bin: default_fluidsynth_bin(),
            tts_bin: default_tts_bin(),
            soundfont_path: default_soundfont_path(),
            magenta_bundle_path: default_magenta_bundle_path(),
            command_timeout_secs: default_command_timeout_secs(),
            sample_rate: default_sample_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Caps concurrently running pipelines. Unbounded when absent.
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
}

impl JobsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_retention_secs() -> u64 {
    60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    15 * 60
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_concurrent_jobs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
