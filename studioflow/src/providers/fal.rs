//! FAL.ai client for image generation (sync endpoint) and image-to-video
//! generation (queue endpoint with status polling).

use super::http::{build_http_client, send_json, trim_base};
use super::{ImageGenerator, ImageOptions, ImageOutput, VideoGenerator, VideoOutput, VideoRequest};
use crate::config::FalSettings;
use crate::errors::ProviderError;
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const PROVIDER: &str = "fal";

#[derive(Serialize, Debug)]
struct ImageRequest<'a> {
    prompt: &'a str,
    image_size: &'a str,
    num_images: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct ImageResponse {
    #[serde(default)]
    images: Vec<FalImage>,
}

#[derive(Deserialize, Debug)]
struct FalImage {
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Serialize, Debug)]
struct VideoSubmit<'a> {
    prompt: &'a str,
    image_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
}

#[derive(Deserialize, Debug)]
struct QueueTicket {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Deserialize, Debug)]
struct QueueStatus {
    status: String,
}

#[derive(Deserialize, Debug)]
struct VideoResult {
    video: Option<FalVideo>,
}

#[derive(Deserialize, Debug)]
struct FalVideo {
    url: String,
    #[serde(default)]
    duration: Option<f64>,
}

/// Where a queued request stands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum QueueState {
    Waiting,
    Completed,
    Failed(String),
}

fn parse_queue_status(status: &str) -> QueueState {
    match status {
        "IN_QUEUE" | "IN_PROGRESS" => QueueState::Waiting,
        "COMPLETED" => QueueState::Completed,
        other => QueueState::Failed(other.to_string()),
    }
}

/// FAL.ai client.
#[derive(Clone, Debug)]
pub struct FalClient {
    api_key: String,
    run_url: String,
    queue_url: String,
    image_model: String,
    video_model: String,
    client: Client,
    timeout: Option<Duration>,
    poll_interval: Duration,
    max_wait: Option<Duration>,
    retry: RetryConfig,
}

impl FalClient {
    /// Creates a client from settings.
    pub fn new(
        settings: &FalSettings,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_credential(PROVIDER))?;
        Ok(Self {
            api_key,
            run_url: trim_base(&settings.run_url).to_string(),
            queue_url: trim_base(&settings.queue_url).to_string(),
            image_model: settings.image_model.clone(),
            video_model: settings.video_model.clone(),
            client: build_http_client(timeout)?,
            timeout,
            poll_interval,
            max_wait: None,
            retry: RetryConfig::default(),
        })
    }

    /// Sets the retry policy for individual requests.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Caps the total time spent polling one video job.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    fn auth(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn generate_image_once(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<ImageOutput, ProviderError> {
        let url = format!("{}/{}", self.run_url, self.image_model);
        let body = ImageRequest {
            prompt,
            image_size: &options.image_size,
            num_images: 1,
            seed: options.seed,
        };
        let response: ImageResponse = send_json(
            PROVIDER,
            self.timeout,
            self.client
                .post(&url)
                .header("Authorization", self.auth())
                .json(&body),
        )
        .await?;

        first_image(response)
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<QueueTicket, ProviderError> {
        let url = format!("{}/{}", self.queue_url, self.video_model);
        let body = VideoSubmit {
            prompt: &request.prompt,
            image_url: &request.image_url,
            duration: request.duration_seconds.map(|d| d.to_string()),
        };
        with_retry(&self.retry, PROVIDER, || {
            send_json::<QueueTicket>(
                PROVIDER,
                self.timeout,
                self.client
                    .post(&url)
                    .header("Authorization", self.auth())
                    .json(&body),
            )
        })
        .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        with_retry(&self.retry, PROVIDER, || {
            send_json::<T>(
                PROVIDER,
                self.timeout,
                self.client.get(url).header("Authorization", self.auth()),
            )
        })
        .await
    }
}

fn first_image(response: ImageResponse) -> Result<ImageOutput, ProviderError> {
    response
        .images
        .into_iter()
        .next()
        .map(|img| ImageOutput {
            url: img.url,
            width: img.width,
            height: img.height,
        })
        .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no images in response"))
}

fn video_output(result: VideoResult) -> Result<VideoOutput, ProviderError> {
    result
        .video
        .map(|v| VideoOutput {
            url: v.url,
            duration_seconds: v.duration,
        })
        .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no video in response"))
}

#[async_trait]
impl ImageGenerator for FalClient {
    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<ImageOutput, ProviderError> {
        with_retry(&self.retry, PROVIDER, || self.generate_image_once(prompt, options)).await
    }
}

#[async_trait]
impl VideoGenerator for FalClient {
    async fn generate_video(&self, request: &VideoRequest) -> Result<VideoOutput, ProviderError> {
        let ticket = self.submit_video(request).await?;
        info!(request_id = %ticket.request_id, model = %self.video_model, "Video job queued");

        let started = Instant::now();
        loop {
            let status: QueueStatus = self.get_json(&ticket.status_url).await?;
            match parse_queue_status(&status.status) {
                QueueState::Completed => break,
                QueueState::Failed(state) => {
                    return Err(ProviderError::invalid_response(
                        PROVIDER,
                        format!("video job {} ended in state {state}", ticket.request_id),
                    ));
                }
                QueueState::Waiting => {
                    if let Some(max_wait) = self.max_wait {
                        if started.elapsed() >= max_wait {
                            return Err(ProviderError::Timeout {
                                provider: PROVIDER.to_string(),
                                seconds: max_wait.as_secs(),
                            });
                        }
                    }
                    debug!(request_id = %ticket.request_id, status = %status.status, "Video job pending");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        let result: VideoResult = self.get_json(&ticket.response_url).await?;
        video_output(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioConfig;

    #[test]
    fn test_requires_key() {
        let config = StudioConfig::default();
        assert!(FalClient::new(&config.fal, None, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_parse_queue_status() {
        assert_eq!(parse_queue_status("IN_QUEUE"), QueueState::Waiting);
        assert_eq!(parse_queue_status("IN_PROGRESS"), QueueState::Waiting);
        assert_eq!(parse_queue_status("COMPLETED"), QueueState::Completed);
        assert_eq!(
            parse_queue_status("FAILED"),
            QueueState::Failed("FAILED".to_string())
        );
    }

    #[test]
    fn test_first_image() {
        let raw = r#"{"images":[{"url":"https://fal.media/a.png","width":1024,"height":576,"content_type":"image/png"}],"seed":42}"#;
        let output = first_image(serde_json::from_str(raw).unwrap()).unwrap();
        assert_eq!(output.url, "https://fal.media/a.png");
        assert_eq!(output.width, Some(1024));

        let empty: ImageResponse = serde_json::from_str(r#"{"images":[]}"#).unwrap();
        assert!(first_image(empty).is_err());
    }

    #[test]
    fn test_ticket_and_video_parsing() {
        let ticket: QueueTicket = serde_json::from_str(
            r#"{"request_id":"r1","status_url":"https://q/s","response_url":"https://q/r","cancel_url":"https://q/c"}"#,
        )
        .unwrap();
        assert_eq!(ticket.request_id, "r1");

        let result: VideoResult =
            serde_json::from_str(r#"{"video":{"url":"https://fal.media/v.mp4"}}"#).unwrap();
        assert_eq!(video_output(result).unwrap().url, "https://fal.media/v.mp4");
    }

    #[test]
    fn test_submit_duration_as_string() {
        let body = VideoSubmit {
            prompt: "slow pan",
            image_url: "https://fal.media/a.png",
            duration: Some(5.to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["duration"], "5");
    }
}
