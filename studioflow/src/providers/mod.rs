//! Generation provider interfaces.
//!
//! Runners only see these traits. The `http` feature adds reqwest-backed
//! clients for OpenAI/OpenRouter, Gemini, ElevenLabs and FAL.ai.

mod data_url;
#[cfg(feature = "http")]
mod elevenlabs;
#[cfg(feature = "http")]
mod fal;
#[cfg(feature = "http")]
mod fetch;
#[cfg(feature = "http")]
mod gemini;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
mod openai;
mod set;

pub use data_url::{decode_data_url, encode_data_url, extension_for_mime, DataUrl};
#[cfg(feature = "http")]
pub use elevenlabs::ElevenLabsClient;
#[cfg(feature = "http")]
pub use fal::FalClient;
#[cfg(feature = "http")]
pub use fetch::HttpAssetFetcher;
#[cfg(feature = "http")]
pub use gemini::GeminiClient;
#[cfg(feature = "http")]
pub use http::build_http_client;
#[cfg(feature = "http")]
pub use openai::OpenAiCompatibleClient;
pub use set::ProviderSet;

use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

/// A text generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    /// System instruction.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Output token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl TextRequest {
    /// Creates a request with a system instruction and prompt.
    #[must_use]
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Synthesized audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechOutput {
    /// Encoded audio bytes.
    pub audio: Vec<u8>,
    /// MIME type of `audio`.
    pub mime_type: String,
}

/// Image generation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Size preset understood by the provider (e.g. `landscape_16_9`).
    pub image_size: String,
    /// Optional seed for reproducible output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            image_size: "landscape_16_9".to_string(),
            seed: None,
        }
    }
}

/// A generated image as returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOutput {
    /// Where the image can be fetched.
    pub url: String,
    /// Pixel width, if reported.
    pub width: Option<u32>,
    /// Pixel height, if reported.
    pub height: Option<u32>,
}

/// An image-to-video request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    /// Source image URL.
    pub image_url: String,
    /// Motion prompt.
    pub prompt: String,
    /// Requested clip length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

/// A generated clip as returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutput {
    /// Where the clip can be fetched.
    pub url: String,
    /// Clip length, if reported.
    pub duration_seconds: Option<f64>,
}

/// Generates text from a prompt.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the generated text.
    async fn generate(&self, request: &TextRequest) -> Result<String, ProviderError>;
}

/// Converts text to speech.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` with `voice_id`.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SpeechOutput, ProviderError>;
}

/// Generates an image from a prompt.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates one image.
    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<ImageOutput, ProviderError>;
}

/// Animates an image into a clip.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Generates one clip.
    async fn generate_video(&self, request: &VideoRequest) -> Result<VideoOutput, ProviderError>;
}

/// Downloads asset bytes for export.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches the bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
