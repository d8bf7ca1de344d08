//! The full set of providers a project needs.

use super::{AssetFetcher, ImageGenerator, ImageOptions, SpeechSynthesizer, TextGenerator, VideoGenerator};
use crate::core::StageId;
#[cfg(feature = "http")]
use crate::errors::StudioError;
use crate::runners::{
    ExportReadinessRunner, ImagePromptRunner, ImageRunner, NarrationRunner, ScriptRunner,
    StageRunner, VideoRunner,
};
use std::sync::Arc;

/// One provider per capability, plus the settings runners need.
#[derive(Clone)]
pub struct ProviderSet {
    /// Scripts and image prompts.
    pub text: Arc<dyn TextGenerator>,
    /// Narration.
    pub speech: Arc<dyn SpeechSynthesizer>,
    /// Images.
    pub images: Arc<dyn ImageGenerator>,
    /// Clips.
    pub videos: Arc<dyn VideoGenerator>,
    /// Export downloads.
    pub fetcher: Arc<dyn AssetFetcher>,
    /// Voice used for narration.
    pub voice_id: String,
    /// Options passed to the image generator.
    pub image_options: ImageOptions,
}

impl ProviderSet {
    /// Builds HTTP clients for every provider selected in `config`.
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::StudioConfig) -> Result<Self, StudioError> {
        use super::{ElevenLabsClient, FalClient, GeminiClient, HttpAssetFetcher, OpenAiCompatibleClient};
        use crate::config::TextProviderKind;

        let timeout = config.request_timeout();
        let retry = config.retry.clone();

        let text: Arc<dyn TextGenerator> = match config.text_provider {
            TextProviderKind::OpenAi => Arc::new(
                OpenAiCompatibleClient::new("openai", &config.openai, timeout)?.with_retry(retry.clone()),
            ),
            TextProviderKind::OpenRouter => Arc::new(
                OpenAiCompatibleClient::new("openrouter", &config.openrouter, timeout)?
                    .with_retry(retry.clone()),
            ),
            TextProviderKind::Gemini => {
                Arc::new(GeminiClient::new(&config.gemini, timeout)?.with_retry(retry.clone()))
            }
        };
        let speech = Arc::new(ElevenLabsClient::new(&config.elevenlabs, timeout)?.with_retry(retry.clone()));
        let fal = Arc::new(FalClient::new(&config.fal, timeout, config.poll_interval())?.with_retry(retry));

        Ok(Self {
            text,
            speech,
            images: fal.clone(),
            videos: fal,
            fetcher: Arc::new(HttpAssetFetcher::new(timeout)?),
            voice_id: config.elevenlabs.voice_id.clone(),
            image_options: ImageOptions {
                image_size: config.fal.image_size.clone(),
                seed: None,
            },
        })
    }

    /// The default runner for `stage`. `brief` is only used by the script.
    #[must_use]
    pub fn runner(&self, stage: StageId, brief: &str) -> Box<dyn StageRunner> {
        match stage {
            StageId::Script => Box::new(ScriptRunner::new(Arc::clone(&self.text), brief)),
            StageId::Narration => {
                Box::new(NarrationRunner::new(Arc::clone(&self.speech), self.voice_id.as_str()))
            }
            StageId::ImagePrompts => Box::new(ImagePromptRunner::new(Arc::clone(&self.text))),
            StageId::Images => Box::new(
                ImageRunner::new(Arc::clone(&self.images)).with_options(self.image_options.clone()),
            ),
            StageId::Videos => Box::new(VideoRunner::new(Arc::clone(&self.videos))),
            StageId::Export => Box::new(ExportReadinessRunner::new()),
        }
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("voice_id", &self.voice_id)
            .field("image_options", &self.image_options)
            .finish_non_exhaustive()
    }
}
