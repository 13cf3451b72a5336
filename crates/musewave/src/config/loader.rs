use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads the config at `path` when it exists, otherwise falls back to defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    match path {
        Some(path) if path.as_ref().exists() => load_config(path),
        Some(path) => {
            log::warn!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !config.public_url_prefix.starts_with('/') {
        return Err(ConfigError::Validation {
            message: format!(
                "public_url_prefix must start with '/': {}",
                config.public_url_prefix
            ),
        });
    }

    if config.jobs.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "jobs.sweep_interval_secs must be greater than zero".to_string(),
        });
    }

    if config.jobs.max_concurrent_jobs == Some(0) {
        return Err(ConfigError::Validation {
            message: "jobs.max_concurrent_jobs must be greater than zero when set".to_string(),
        });
    }

    if config.engines.command_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "engines.command_timeout_secs must be greater than zero".to_string(),
        });
    }

    let binaries = [
        ("python_bin", &config.engines.python_bin),
        ("ffmpeg_bin", &config.engines.ffmpeg_bin),
        ("fluidsynth_bin", &config.engines.fluidsynth_bin),
        ("tts_bin", &config.engines.tts_bin),
    ];
    for (name, value) in binaries {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("engines.{} must not be empty", name),
            });
        }
    }

    if config.engines.sample_rate == 0 {
        return Err(ConfigError::Validation {
            message: "engines.sample_rate must be greater than zero".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Validation {
            message: "server.port must be between 1 and 65535".to_string(),
        });
    }

    Ok(())
}
