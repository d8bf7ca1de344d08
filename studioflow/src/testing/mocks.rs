//! Mock providers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::errors::ProviderError;
use crate::providers::{
    AssetFetcher, ImageGenerator, ImageOptions, ImageOutput, SpeechOutput, SpeechSynthesizer,
    TextGenerator, TextRequest, VideoGenerator, VideoOutput, VideoRequest,
};

/// A text generator that replies from a script of canned responses.
#[derive(Debug, Default)]
pub struct StaticTextGenerator {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Option<String>,
    never_resolves: bool,
    requests: Mutex<Vec<TextRequest>>,
}

impl StaticTextGenerator {
    /// Always replies with `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Replies with each result in turn, then fails.
    #[must_use]
    pub fn with_sequence(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Never replies. Useful for cancellation tests.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            never_resolves: true,
            ..Self::default()
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for StaticTextGenerator {
    async fn generate(&self, request: &TextRequest) -> Result<String, ProviderError> {
        self.requests.lock().push(request.clone());
        if self.never_resolves {
            std::future::pending::<()>().await;
        }
        if let Some(next) = self.responses.lock().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| ProviderError::invalid_response("mock", "no scripted response left"))
    }
}

/// A speech synthesizer returning fixed bytes.
#[derive(Debug)]
pub struct StaticSpeechSynthesizer {
    audio: Vec<u8>,
    mime_type: String,
    calls: AtomicUsize,
}

impl Default for StaticSpeechSynthesizer {
    fn default() -> Self {
        Self::new(b"ID3mock-audio".to_vec(), "audio/mpeg")
    }
}

impl StaticSpeechSynthesizer {
    /// Returns `audio` with `mime_type` on every call.
    #[must_use]
    pub fn new(audio: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            audio,
            mime_type: mime_type.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for StaticSpeechSynthesizer {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<SpeechOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SpeechOutput {
            audio: self.audio.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

/// An image generator that numbers its outputs `https://images.test/{n}.png`.
#[derive(Debug, Default)]
pub struct SequenceImageGenerator {
    calls: AtomicUsize,
    fail_at: Option<usize>,
    cancel_after_first: Option<Arc<CancellationToken>>,
}

impl SequenceImageGenerator {
    /// Creates a generator that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the call with zero-based number `call`.
    #[must_use]
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    /// Cancels `token` once the first image is produced.
    #[must_use]
    pub fn cancelling(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel_after_first = Some(token);
        self
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for SequenceImageGenerator {
    async fn generate_image(
        &self,
        _prompt: &str,
        _options: &ImageOptions,
    ) -> Result<ImageOutput, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(n) {
            return Err(ProviderError::http("mock", 500, format!("image {n} failed")));
        }
        if let Some(token) = &self.cancel_after_first {
            token.cancel("stopped after first image");
        }
        Ok(ImageOutput {
            url: format!("https://images.test/{n}.png"),
            width: Some(1024),
            height: Some(576),
        })
    }
}

/// A video generator that numbers its outputs `https://videos.test/{n}.mp4`.
#[derive(Debug, Default)]
pub struct SequenceVideoGenerator {
    calls: AtomicUsize,
    requests: Mutex<Vec<VideoRequest>>,
}

impl SequenceVideoGenerator {
    /// Creates the generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<VideoRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl VideoGenerator for SequenceVideoGenerator {
    async fn generate_video(&self, request: &VideoRequest) -> Result<VideoOutput, ProviderError> {
        self.requests.lock().push(request.clone());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(VideoOutput {
            url: format!("https://videos.test/{n}.mp4"),
            duration_seconds: Some(5.0),
        })
    }
}

/// An asset fetcher backed by a map.
///
/// Unknown URLs return their own bytes unless marked as failing.
#[derive(Debug, Default)]
pub struct MapFetcher {
    assets: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl MapFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `bytes` for `url`.
    #[must_use]
    pub fn with_asset(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(url.into(), bytes.into());
        self
    }

    /// Makes fetching `url` fail with a 404.
    #[must_use]
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl AssetFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.fetched.lock().push(url.to_string());
        if self.failing.contains(url) {
            return Err(ProviderError::http("fetch", 404, "not found"));
        }
        Ok(self
            .assets
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.as_bytes().to_vec()))
    }
}
