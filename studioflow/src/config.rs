//! Studio configuration: provider credentials, models and pacing.

use crate::errors::StudioError;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which backend generates text (scripts and image prompts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextProviderKind {
    /// OpenAI chat completions.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// OpenRouter (OpenAI-compatible).
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// Google Gemini `generateContent`.
    Gemini,
}

/// Credentials and model for one HTTP provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key. `None` means the provider is not configured.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
}

impl ProviderSettings {
    fn new(base_url: &str, model: &str) -> Self {
        Self {
            api_key: None,
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }

    /// Returns the API key, or an error naming the provider.
    pub fn require_key(&self, provider: &str) -> Result<&str, StudioError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StudioError::Config(format!("missing API key for {provider}")))
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Provider credentials and model.
    #[serde(flatten)]
    pub provider: ProviderSettings,
    /// Default voice.
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
}

/// FAL.ai settings for image and video generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FalSettings {
    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Synchronous endpoint base.
    #[serde(default = "default_fal_run_url")]
    pub run_url: String,
    /// Queue endpoint base.
    #[serde(default = "default_fal_queue_url")]
    pub queue_url: String,
    /// Image model path.
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Image-to-video model path.
    #[serde(default = "default_video_model")]
    pub video_model: String,
    /// Image size preset.
    #[serde(default = "default_image_size")]
    pub image_size: String,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Which text backend the script and prompt runners use.
    #[serde(default)]
    pub text_provider: TextProviderKind,
    /// OpenAI settings.
    #[serde(default = "default_openai")]
    pub openai: ProviderSettings,
    /// OpenRouter settings.
    #[serde(default = "default_openrouter")]
    pub openrouter: ProviderSettings,
    /// Gemini settings.
    #[serde(default = "default_gemini")]
    pub gemini: ProviderSettings,
    /// ElevenLabs settings.
    #[serde(default = "default_elevenlabs")]
    pub elevenlabs: SpeechSettings,
    /// FAL.ai settings.
    #[serde(default = "default_fal")]
    pub fal: FalSettings,
    /// Fixed pause between items of a batch stage, in milliseconds.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
    /// Interval between queue status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request timeout. `None` waits indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Retry policy for provider calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Directory for the JSON file store.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_fal_run_url() -> String {
    "https://fal.run".to_string()
}

fn default_fal_queue_url() -> String {
    "https://queue.fal.run".to_string()
}

fn default_image_model() -> String {
    "fal-ai/flux/schnell".to_string()
}

fn default_video_model() -> String {
    "fal-ai/kling-video/v1.6/standard/image-to-video".to_string()
}

fn default_image_size() -> String {
    "landscape_16_9".to_string()
}

fn default_openai() -> ProviderSettings {
    ProviderSettings::new("https://api.openai.com/v1", "gpt-4o-mini")
}

fn default_openrouter() -> ProviderSettings {
    ProviderSettings::new("https://openrouter.ai/api/v1", "openai/gpt-4o-mini")
}

fn default_gemini() -> ProviderSettings {
    ProviderSettings::new(
        "https://generativelanguage.googleapis.com/v1beta",
        "gemini-1.5-flash",
    )
}

fn default_elevenlabs() -> SpeechSettings {
    SpeechSettings {
        provider: ProviderSettings::new("https://api.elevenlabs.io/v1", "eleven_multilingual_v2"),
        voice_id: default_voice_id(),
    }
}

fn default_fal() -> FalSettings {
    FalSettings {
        api_key: None,
        run_url: default_fal_run_url(),
        queue_url: default_fal_queue_url(),
        image_model: default_image_model(),
        video_model: default_video_model(),
        image_size: default_image_size(),
    }
}

fn default_item_delay_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            text_provider: TextProviderKind::default(),
            openai: default_openai(),
            openrouter: default_openrouter(),
            gemini: default_gemini(),
            elevenlabs: default_elevenlabs(),
            fal: default_fal(),
            item_delay_ms: default_item_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: None,
            retry: RetryConfig::default(),
            store_path: None,
        }
    }
}

impl StudioConfig {
    /// Creates a configuration with defaults and no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON configuration file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StudioError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| {
            StudioError::Config(format!("{}: {e}", path.as_ref().display()))
        })
    }

    /// Builds a configuration from environment variables.
    pub fn from_env() -> Result<Self, StudioError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Recognised keys: `OPENAI_API_KEY`, `OPENROUTER_API_KEY`,
    /// `GEMINI_API_KEY`, `ELEVENLABS_API_KEY`, `FAL_KEY`,
    /// `STUDIO_TEXT_PROVIDER`, `STUDIO_TEXT_MODEL`, `STUDIO_VOICE_ID`,
    /// `STUDIO_IMAGE_MODEL`, `STUDIO_VIDEO_MODEL`, `STUDIO_ITEM_DELAY_MS`,
    /// `STUDIO_POLL_INTERVAL_MS`, `STUDIO_REQUEST_TIMEOUT_SECS`,
    /// `STUDIO_MAX_ATTEMPTS`, `STUDIO_STORE_PATH`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StudioError> {
        let mut config = Self::default();

        config.openai.api_key = lookup("OPENAI_API_KEY");
        config.openrouter.api_key = lookup("OPENROUTER_API_KEY");
        config.gemini.api_key = lookup("GEMINI_API_KEY");
        config.elevenlabs.provider.api_key = lookup("ELEVENLABS_API_KEY");
        config.fal.api_key = lookup("FAL_KEY");

        if let Some(kind) = lookup("STUDIO_TEXT_PROVIDER") {
            config.text_provider = match kind.to_ascii_lowercase().as_str() {
                "openai" => TextProviderKind::OpenAi,
                "openrouter" => TextProviderKind::OpenRouter,
                "gemini" => TextProviderKind::Gemini,
                other => {
                    return Err(StudioError::Config(format!(
                        "unknown STUDIO_TEXT_PROVIDER '{other}'"
                    )))
                }
            };
        }
        if let Some(model) = lookup("STUDIO_TEXT_MODEL") {
            config.text_settings_mut().model = model;
        }
        if let Some(voice) = lookup("STUDIO_VOICE_ID") {
            config.elevenlabs.voice_id = voice;
        }
        if let Some(model) = lookup("STUDIO_IMAGE_MODEL") {
            config.fal.image_model = model;
        }
        if let Some(model) = lookup("STUDIO_VIDEO_MODEL") {
            config.fal.video_model = model;
        }
        if let Some(v) = lookup("STUDIO_ITEM_DELAY_MS") {
            config.item_delay_ms = parse_number("STUDIO_ITEM_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("STUDIO_POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_number("STUDIO_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("STUDIO_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = Some(parse_number("STUDIO_REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("STUDIO_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_number("STUDIO_MAX_ATTEMPTS", &v)?;
        }
        config.store_path = lookup("STUDIO_STORE_PATH").map(PathBuf::from);

        Ok(config)
    }

    /// Settings of the selected text provider.
    #[must_use]
    pub fn text_settings(&self) -> &ProviderSettings {
        match self.text_provider {
            TextProviderKind::OpenAi => &self.openai,
            TextProviderKind::OpenRouter => &self.openrouter,
            TextProviderKind::Gemini => &self.gemini,
        }
    }

    fn text_settings_mut(&mut self) -> &mut ProviderSettings {
        match self.text_provider {
            TextProviderKind::OpenAi => &mut self.openai,
            TextProviderKind::OpenRouter => &mut self.openrouter,
            TextProviderKind::Gemini => &mut self.gemini,
        }
    }

    /// Pause between batch items.
    #[must_use]
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    /// Interval between queue polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request timeout, if any.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Checks pacing values and that every provider the pipeline needs has
    /// a key.
    pub fn validate(&self) -> Result<(), StudioError> {
        if self.poll_interval_ms == 0 {
            return Err(StudioError::Config("poll_interval_ms must be > 0".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(StudioError::Config("retry.max_attempts must be >= 1".to_string()));
        }
        let text_name = match self.text_provider {
            TextProviderKind::OpenAi => "openai",
            TextProviderKind::OpenRouter => "openrouter",
            TextProviderKind::Gemini => "gemini",
        };
        self.text_settings().require_key(text_name)?;
        self.elevenlabs.provider.require_key("elevenlabs")?;
        if self.fal.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(StudioError::Config("missing API key for fal".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StudioError> {
    value
        .trim()
        .parse()
        .map_err(|_| StudioError::Config(format!("{key} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.text_provider, TextProviderKind::OpenAi);
        assert_eq!(config.item_delay(), Duration::from_millis(1000));
        assert!(config.request_timeout().is_none());
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_from_lookup() {
        let config = StudioConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "g-key"),
            ("ELEVENLABS_API_KEY", "e-key"),
            ("FAL_KEY", "f-key"),
            ("STUDIO_TEXT_PROVIDER", "Gemini"),
            ("STUDIO_TEXT_MODEL", "gemini-2.0-flash"),
            ("STUDIO_ITEM_DELAY_MS", "250"),
            ("STUDIO_REQUEST_TIMEOUT_SECS", "90"),
        ]))
        .unwrap();

        assert_eq!(config.text_provider, TextProviderKind::Gemini);
        assert_eq!(config.text_settings().model, "gemini-2.0-flash");
        assert_eq!(config.item_delay_ms, 250);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(90)));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        assert!(StudioConfig::from_lookup(lookup_from(&[("STUDIO_TEXT_PROVIDER", "claude")])).is_err());
        assert!(StudioConfig::from_lookup(lookup_from(&[("STUDIO_ITEM_DELAY_MS", "soon")])).is_err());
    }

    #[test]
    fn test_validate_missing_keys() {
        let err = StudioConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let config = StudioConfig {
            poll_interval_ms: 0,
            ..StudioConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(
            &path,
            r#"{"text_provider": "openrouter", "fal": {"api_key": "k"}, "item_delay_ms": 0}"#,
        )
        .unwrap();

        let config = StudioConfig::from_file(&path).unwrap();
        assert_eq!(config.text_provider, TextProviderKind::OpenRouter);
        assert_eq!(config.fal.api_key.as_deref(), Some("k"));
        assert_eq!(config.fal.image_model, "fal-ai/flux/schnell");
        assert_eq!(config.item_delay_ms, 0);
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }
}
