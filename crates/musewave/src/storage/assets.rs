use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};

use crate::config::Config;
use crate::engine::video::VideoStyle;
use crate::error::StorageError;

/// Fixed artifact names inside a job directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFile {
    Instrumental,
    Melody,
    Vocals,
    Captions,
    Texture,
    Mix,
    Video(VideoStyle),
}

impl AssetFile {
    pub fn file_name(&self) -> String {
        match self {
            AssetFile::Instrumental => "instrumental.wav".to_string(),
            AssetFile::Melody => "melody.wav".to_string(),
            AssetFile::Vocals => "vocals.wav".to_string(),
            AssetFile::Captions => "captions.srt".to_string(),
            AssetFile::Texture => "texture.wav".to_string(),
            AssetFile::Mix => "mix.wav".to_string(),
            AssetFile::Video(style) => format!("{}.mp4", style.slug()),
        }
    }
}

/// Maps jobs to `<assets>/<YYYY>/<MM>/<job-id>/` and the mirrored public URL.
#[derive(Debug, Clone)]
pub struct AssetLayout {
    root: PathBuf,
    url_prefix: String,
}

impl AssetLayout {
    pub fn new<P: AsRef<Path>>(root: P, url_prefix: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.assets_directory, &config.public_url_prefix)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Resolves the directory for `job_id`, bucketed by the month of `at`.
    pub fn for_job(&self, job_id: &str, at: DateTime<Utc>) -> JobAssets {
        let year = format!("{:04}", at.year());
        let month = format!("{:02}", at.month());

        JobAssets {
            dir: self.root.join(&year).join(&month).join(job_id),
            url_base: format!("{}/{}/{}/{}", self.url_prefix, year, month, job_id),
        }
    }

    /// Public URL of any file under the assets root.
    pub fn url_for(&self, path: &Path) -> Result<String, StorageError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::OutsideAssets(path.to_path_buf()))?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        Ok(format!("{}/{}", self.url_prefix, parts.join("/")))
    }
}

/// Asset directory of a single job.
#[derive(Debug, Clone)]
pub struct JobAssets {
    dir: PathBuf,
    url_base: String,
}

impl JobAssets {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: self.dir.clone(),
                source: e,
            })
    }

    pub fn path(&self, file: AssetFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    /// URL for a path produced inside this job directory.
    pub fn url_for(&self, path: &Path) -> Result<String, StorageError> {
        let name = path
            .strip_prefix(&self.dir)
            .ok()
            .and_then(|rel| rel.to_str())
            .filter(|rel| !rel.is_empty())
            .ok_or_else(|| StorageError::OutsideAssets(path.to_path_buf()))?;

        Ok(format!("{}/{}", self.url_base, name.replace('\\', "/")))
    }

    pub async fn write(&self, file: AssetFile, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_dir().await?;
        let path = self.path(file);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }
}
