//! ElevenLabs text-to-speech client.

use super::http::{build_http_client, send, trim_base};
use super::{SpeechOutput, SpeechSynthesizer};
use crate::config::SpeechSettings;
use crate::errors::ProviderError;
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "elevenlabs";

#[derive(Serialize, Debug)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize, Debug, Clone, Copy)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

/// ElevenLabs speech client.
#[derive(Clone, Debug)]
pub struct ElevenLabsClient {
    api_key: String,
    base_url: String,
    model_id: String,
    client: Client,
    timeout: Option<Duration>,
    retry: RetryConfig,
}

impl ElevenLabsClient {
    /// Creates a client from settings.
    pub fn new(settings: &SpeechSettings, timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let api_key = settings
            .provider
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_credential(PROVIDER))?;
        Ok(Self {
            api_key,
            base_url: trim_base(&settings.provider.base_url).to_string(),
            model_id: settings.provider.model.clone(),
            client: build_http_client(timeout)?,
            timeout,
            retry: RetryConfig::default(),
        })
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn synthesize_once(&self, text: &str, voice_id: &str) -> Result<SpeechOutput, ProviderError> {
        let url = format!("{}/text-to-speech/{}", self.base_url, voice_id);
        let body = TextToSpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings::default(),
        };

        let response = send(
            PROVIDER,
            self.timeout,
            self.client
                .post(&url)
                .header("xi-api-key", &self.api_key)
                .header("Accept", "audio/mpeg")
                .query(&[("output_format", "mp3_44100_128")])
                .json(&body),
        )
        .await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| "audio/mpeg".to_string(), ToString::to_string);
        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e.to_string()))?
            .to_vec();

        if audio.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "empty audio body"));
        }
        debug!(bytes = audio.len(), voice_id, "Synthesized narration");
        Ok(SpeechOutput { audio, mime_type })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SpeechOutput, ProviderError> {
        with_retry(&self.retry, PROVIDER, || self.synthesize_once(text, voice_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioConfig;

    #[test]
    fn test_requires_key() {
        let config = StudioConfig::default();
        assert!(ElevenLabsClient::new(&config.elevenlabs, None).is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = TextToSpeechRequest {
            text: "Hello",
            model_id: "eleven_multilingual_v2",
            voice_settings: VoiceSettings::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
    }
}
