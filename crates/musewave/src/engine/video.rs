//! Video rendering of the final mix.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EnginesConfig;
use crate::engine::runner::{CommandRunner, CommandSpec};
use crate::engine::{ensure_artifact, path_arg};
use crate::error::EngineError;

pub const WIDTH: u32 = 1280;
pub const HEIGHT: u32 = 720;
pub const FPS: u32 = 30;

/// Visual style a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VideoStyle {
    #[serde(rename = "Lyric Video")]
    LyricVideo,
    #[serde(rename = "Official Music Video")]
    OfficialMusicVideo,
    #[serde(rename = "Abstract Visualizer")]
    AbstractVisualizer,
}

impl VideoStyle {
    pub const ALL: [VideoStyle; 3] = [
        VideoStyle::LyricVideo,
        VideoStyle::OfficialMusicVideo,
        VideoStyle::AbstractVisualizer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VideoStyle::LyricVideo => "Lyric Video",
            VideoStyle::OfficialMusicVideo => "Official Music Video",
            VideoStyle::AbstractVisualizer => "Abstract Visualizer",
        }
    }

    /// Key used in `videoUrls` and in the file name.
    pub fn slug(self) -> &'static str {
        match self {
            VideoStyle::LyricVideo => "lyric-video",
            VideoStyle::OfficialMusicVideo => "official-music-video",
            VideoStyle::AbstractVisualizer => "abstract-visualizer",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl std::fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a frame sequence is drawn for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Visual {
    Subtitles(PathBuf),
    Waveform,
    Spectrum,
}

impl Visual {
    /// Lyric videos need captions; without them they degrade to a waveform.
    fn choose(style: VideoStyle, captions: Option<&Path>) -> Self {
        match (style, captions) {
            (VideoStyle::LyricVideo, Some(path)) => Visual::Subtitles(path.to_path_buf()),
            (VideoStyle::LyricVideo, None) | (VideoStyle::OfficialMusicVideo, _) => {
                Visual::Waveform
            }
            (VideoStyle::AbstractVisualizer, _) => Visual::Spectrum,
        }
    }
}

pub struct VideoRenderer {
    runner: Arc<dyn CommandRunner>,
    ffmpeg_bin: String,
    timeout: Duration,
}

impl VideoRenderer {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &EnginesConfig) -> Self {
        Self {
            runner,
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            timeout: config.command_timeout(),
        }
    }

    fn command(&self, visual: &Visual, audio: &Path, output: &Path) -> CommandSpec {
        let size = format!("{}x{}", WIDTH, HEIGHT);
        let spec = CommandSpec::new(&self.ffmpeg_bin, self.timeout).arg("-y");

        let spec = match visual {
            Visual::Subtitles(captions) => spec
                .args(["-f", "lavfi", "-i"])
                .arg(format!("color=c=black:s={}:r={}", size, FPS))
                .arg("-i")
                .arg(path_arg(audio))
                .arg("-vf")
                .arg(format!("subtitles='{}'", escape_filter_path(captions))),
            Visual::Waveform => spec.arg("-i").arg(path_arg(audio)).arg("-filter_complex").arg(
                format!(
                    "[0:a]showwaves=s={}:mode=cline:colors=cyan:rate={}[v]",
                    size, FPS
                ),
            ),
            Visual::Spectrum => spec.arg("-i").arg(path_arg(audio)).arg("-filter_complex").arg(
                format!(
                    "[0:a]showspectrum=s={}:color=rainbow:legend=disabled,fps={}[v]",
                    size, FPS
                ),
            ),
        };

        let spec = match visual {
            Visual::Subtitles(_) => spec.args(["-map", "0:v", "-map", "1:a"]),
            _ => spec.args(["-map", "[v]", "-map", "0:a"]),
        };

        spec.args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
            .arg(path_arg(output))
    }

    /// Renders `audio` as a `style` video into `output`.
    pub async fn render(
        &self,
        style: VideoStyle,
        audio: &Path,
        captions: Option<&Path>,
        output: &Path,
    ) -> Result<PathBuf, EngineError> {
        let visual = Visual::choose(style, captions);
        if style == VideoStyle::LyricVideo && captions.is_none() {
            tracing::info!("No captions for lyric video, rendering waveform instead");
        }

        self.runner
            .run_checked(&self.command(&visual, audio, output))
            .await?;
        ensure_artifact(output).await
    }
}

/// Quotes a path for use inside a filtergraph argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::ScriptedRunner;

    fn renderer(runner: Arc<ScriptedRunner>) -> VideoRenderer {
        VideoRenderer::new(runner, &EnginesConfig::default())
    }

    #[test]
    fn test_style_labels_round_trip_through_serde() {
        let style: VideoStyle = serde_json::from_str("\"Abstract Visualizer\"").unwrap();
        assert_eq!(style, VideoStyle::AbstractVisualizer);
        assert_eq!(
            serde_json::to_string(&VideoStyle::LyricVideo).unwrap(),
            "\"Lyric Video\""
        );
        assert!(serde_json::from_str::<VideoStyle>("\"Karaoke\"").is_err());
    }

    #[test]
    fn test_slug_matches_label() {
        assert_eq!(VideoStyle::LyricVideo.slug(), "lyric-video");
        assert_eq!(VideoStyle::OfficialMusicVideo.slug(), "official-music-video");
        assert_eq!(VideoStyle::AbstractVisualizer.slug(), "abstract-visualizer");
        for style in VideoStyle::ALL {
            assert_eq!(VideoStyle::from_label(style.label()), Some(style));
        }
    }

    #[test]
    fn test_visual_choice() {
        let srt = Path::new("/tmp/captions.srt");
        assert_eq!(
            Visual::choose(VideoStyle::LyricVideo, Some(srt)),
            Visual::Subtitles(srt.to_path_buf())
        );
        assert_eq!(Visual::choose(VideoStyle::LyricVideo, None), Visual::Waveform);
        assert_eq!(
            Visual::choose(VideoStyle::OfficialMusicVideo, Some(srt)),
            Visual::Waveform
        );
        assert_eq!(
            Visual::choose(VideoStyle::AbstractVisualizer, None),
            Visual::Spectrum
        );
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\it's\\captions.srt")),
            "C\\:/it\\'s/captions.srt"
        );
    }

    #[tokio::test]
    async fn test_render_spectrum() {
        let runner = Arc::new(ScriptedRunner::new());
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("mix.wav");
        let output = dir.path().join("abstract-visualizer.mp4");

        let path = renderer(runner.clone())
            .render(VideoStyle::AbstractVisualizer, &audio, None, &output)
            .await
            .unwrap();
        assert_eq!(path, output);

        let call = runner.calls().pop().unwrap();
        assert!(call
            .arg_after("-filter_complex")
            .unwrap()
            .contains("showspectrum=s=1280x720"));
    }

    #[tokio::test]
    async fn test_render_lyric_video_with_subtitles() {
        let runner = Arc::new(ScriptedRunner::new());
        let dir = tempfile::tempdir().unwrap();
        let captions = dir.path().join("captions.srt");
        let output = dir.path().join("lyric-video.mp4");

        renderer(runner.clone())
            .render(
                VideoStyle::LyricVideo,
                &dir.path().join("mix.wav"),
                Some(&captions),
                &output,
            )
            .await
            .unwrap();

        let call = runner.calls().pop().unwrap();
        assert!(call.arg_after("-vf").unwrap().starts_with("subtitles="));
        assert!(output.exists());
    }
}
