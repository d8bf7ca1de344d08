//! Google Gemini `generateContent` client.

use super::http::{build_http_client, send_json, trim_base};
use super::{TextGenerator, TextRequest};
use crate::config::ProviderSettings;
use crate::errors::ProviderError;
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "gemini";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini text client.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
    timeout: Option<Duration>,
    retry: RetryConfig,
}

impl GeminiClient {
    /// Creates a client from settings.
    pub fn new(settings: &ProviderSettings, timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_credential(PROVIDER))?;
        Ok(Self {
            api_key,
            base_url: trim_base(&settings.base_url).to_string(),
            model: settings.model.clone(),
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

    async fn generate_once(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_request(request);

        let response: GenerateResponse = send_json(
            PROVIDER,
            self.timeout,
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body),
        )
        .await?;

        extract_text(response)
    }
}

fn build_request(request: &TextRequest) -> GenerateRequest<'_> {
    let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
        Some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        })
    } else {
        None
    };
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &request.system,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        generation_config,
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, ProviderError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::invalid_response(PROVIDER, "no candidate text"));
    }
    Ok(text.to_string())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &TextRequest) -> Result<String, ProviderError> {
        with_retry(&self.retry, PROVIDER, || self.generate_once(request)).await
    }
}
