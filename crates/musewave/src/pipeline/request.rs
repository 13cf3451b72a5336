use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::VideoStyle;

pub const MIN_DURATION_SECS: u32 = 30;
pub const MAX_DURATION_SECS: u32 = 180;
pub const DEFAULT_DURATION_SECS: u32 = 90;
pub const MAX_PROMPT_CHARS: usize = 2000;

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

/// Body of a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub music_prompt: String,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Track length in seconds.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_inspiration: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub generate_video: bool,
    /// Style labels as sent by the client; checked by [`Self::validate`].
    #[serde(default)]
    pub video_styles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(music_prompt: impl Into<String>) -> Self {
        Self {
            music_prompt: music_prompt.into(),
            genres: Vec::new(),
            duration: DEFAULT_DURATION_SECS,
            artist_inspiration: None,
            lyrics: None,
            languages: None,
            generate_video: false,
            video_styles: Vec::new(),
            seed: None,
        }
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let prompt = self.music_prompt.trim();
        if prompt.is_empty() {
            errors.push("musicPrompt", "must not be empty");
        } else if prompt.chars().count() > MAX_PROMPT_CHARS {
            errors.push(
                "musicPrompt",
                format!("must be at most {} characters", MAX_PROMPT_CHARS),
            );
        }

        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&self.duration) {
            errors.push(
                "duration",
                format!(
                    "must be between {} and {} seconds",
                    MIN_DURATION_SECS, MAX_DURATION_SECS
                ),
            );
        }

        if self.genres.iter().any(|g| g.trim().is_empty()) {
            errors.push("genres", "must not contain empty entries");
        }

        for label in &self.video_styles {
            if VideoStyle::from_label(label).is_none() {
                errors.push("videoStyles", format!("unknown style '{}'", label));
            }
        }

        errors.into_result()
    }

    /// Lyrics with surrounding whitespace removed; `None` when blank.
    pub fn lyrics(&self) -> Option<&str> {
        self.lyrics
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Styles to render, in request order without repeats. Empty unless
    /// `generateVideo` is set.
    pub fn requested_styles(&self) -> Vec<VideoStyle> {
        if !self.generate_video {
            return Vec::new();
        }

        let mut styles = Vec::new();
        for style in self.video_styles.iter().filter_map(|l| VideoStyle::from_label(l)) {
            if !styles.contains(&style) {
                styles.push(style);
            }
        }
        styles
    }

    /// TTS language code for the first requested language.
    pub fn language_code(&self) -> Option<String> {
        let first = self.languages.as_ref()?.first()?.trim();
        language_code(first)
    }
}

fn language_code(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "english" => "en",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "dutch" => "nl",
        "polish" => "pl",
        "turkish" => "tr",
        "russian" => "ru",
        "japanese" => "ja",
        "chinese" => "zh-cn",
        "korean" => "ko",
        "hindi" => "hi",
        other if other.len() == 2 && other.chars().all(|c| c.is_ascii_alphabetic()) => other,
        _ => return None,
    };
    Some(code.to_string())
}

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field-level problem found in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"musicPrompt": "test"}"#).unwrap();
        assert_eq!(request.duration, 90);
        assert!(request.genres.is_empty());
        assert!(!request.generate_video);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_camel_case_fields() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{
                "musicPrompt": "neon city",
                "genres": ["synthwave"],
                "duration": 45,
                "artistInspiration": ["Kavinsky"],
                "generateVideo": true,
                "videoStyles": ["Abstract Visualizer"],
                "seed": 11
            }"#,
        )
        .unwrap();
        assert_eq!(request.artist_inspiration.as_deref(), Some(&["Kavinsky".to_string()][..]));
        assert_eq!(request.requested_styles(), vec![VideoStyle::AbstractVisualizer]);
        assert_eq!(request.seed, Some(11));
    }

    #[test]
    fn test_reports_every_invalid_field() {
        let mut request = GenerationRequest::new("  ");
        request.duration = 500;
        request.video_styles = vec!["Karaoke".to_string()];

        let errors = request.validate().unwrap_err();
        let fields: Vec<&str> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["musicPrompt", "duration", "videoStyles"]);
        assert!(errors.to_string().contains("duration: must be between 30 and 180"));
    }

    #[test]
    fn test_duration_bounds_inclusive() {
        let mut request = GenerationRequest::new("test");
        request.duration = 30;
        assert!(request.validate().is_ok());
        request.duration = 180;
        assert!(request.validate().is_ok());
        request.duration = 29;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_styles_ignored_without_generate_video() {
        let mut request = GenerationRequest::new("test");
        request.video_styles = vec!["Lyric Video".to_string()];
        assert!(request.requested_styles().is_empty());

        request.generate_video = true;
        request.video_styles.push("Lyric Video".to_string());
        assert_eq!(request.requested_styles(), vec![VideoStyle::LyricVideo]);
    }

    #[test]
    fn test_blank_lyrics_are_absent() {
        let mut request = GenerationRequest::new("test");
        request.lyrics = Some(" \n ".to_string());
        assert_eq!(request.lyrics(), None);
        request.lyrics = Some(" hello world ".to_string());
        assert_eq!(request.lyrics(), Some("hello world"));
    }

    #[test]
    fn test_language_code() {
        let mut request = GenerationRequest::new("test");
        assert_eq!(request.language_code(), None);
        request.languages = Some(vec!["Spanish".to_string(), "English".to_string()]);
        assert_eq!(request.language_code().as_deref(), Some("es"));
        request.languages = Some(vec!["FR".to_string()]);
        assert_eq!(request.language_code().as_deref(), Some("fr"));
        request.languages = Some(vec!["Klingon".to_string()]);
        assert_eq!(request.language_code(), None);
    }
}
