//! Batch media stages: images from prompts, clips from images.
//!
//! Items are generated one at a time with a fixed pause between them. The
//! first failed item fails the whole stage.

use super::{RunContext, RunnerInputs, StageRunner};
use crate::core::{GeneratedImage, GeneratedVideo, StageArtifact, StageId};
use crate::errors::StudioError;
use crate::providers::{ImageGenerator, ImageOptions, VideoGenerator, VideoRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Generates one image per approved prompt.
pub struct ImageRunner {
    generator: Arc<dyn ImageGenerator>,
    options: ImageOptions,
}

impl ImageRunner {
    /// Creates a runner with default image options.
    #[must_use]
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            options: ImageOptions::default(),
        }
    }

    /// Sets the image options.
    #[must_use]
    pub fn with_options(mut self, options: ImageOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl StageRunner for ImageRunner {
    fn stage(&self) -> StageId {
        StageId::Images
    }

    async fn run(&self, inputs: &RunnerInputs, ctx: &RunContext) -> Result<StageArtifact, StudioError> {
        let prompts = inputs.prompts()?;
        let total = prompts.len();
        let mut images = Vec::with_capacity(total);

        for (i, prompt) in prompts.iter().enumerate() {
            if i > 0 {
                ctx.pause_between_items().await?;
            }
            ctx.check_cancelled()?;

            let output = ctx
                .guard(self.generator.generate_image(&prompt.prompt, &self.options))
                .await?;
            debug!(item = prompt.index, total, url = %output.url, "Image generated");
            images.push(GeneratedImage {
                index: prompt.index,
                prompt: prompt.prompt.clone(),
                url: output.url,
                width: output.width,
                height: output.height,
            });
            ctx.item_generated(StageId::Images, prompt.index, total).await;
        }

        Ok(StageArtifact::Images { images })
    }
}

impl std::fmt::Debug for ImageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Animates each approved image into a short clip.
pub struct VideoRunner {
    generator: Arc<dyn VideoGenerator>,
    motion_prompt: Option<String>,
    duration_seconds: Option<u32>,
}

impl VideoRunner {
    /// Creates a runner. Each clip reuses its image's prompt as motion prompt.
    #[must_use]
    pub fn new(generator: Arc<dyn VideoGenerator>) -> Self {
        Self {
            generator,
            motion_prompt: None,
            duration_seconds: None,
        }
    }

    /// Uses a fixed motion prompt for every clip.
    #[must_use]
    pub fn with_motion_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.motion_prompt = Some(prompt.into());
        self
    }

    /// Requests clips of `seconds` length.
    #[must_use]
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    fn request_for(&self, image: &GeneratedImage) -> VideoRequest {
        VideoRequest {
            image_url: image.url.clone(),
            prompt: self
                .motion_prompt
                .clone()
                .unwrap_or_else(|| image.prompt.clone()),
            duration_seconds: self.duration_seconds,
        }
    }
}

#[async_trait]
impl StageRunner for VideoRunner {
    fn stage(&self) -> StageId {
        StageId::Videos
    }

    async fn run(&self, inputs: &RunnerInputs, ctx: &RunContext) -> Result<StageArtifact, StudioError> {
        let images = inputs.images()?;
        let total = images.len();
        let mut videos = Vec::with_capacity(total);

        for (i, image) in images.iter().enumerate() {
            if i > 0 {
                ctx.pause_between_items().await?;
            }
            ctx.check_cancelled()?;

            let output = ctx
                .guard(self.generator.generate_video(&self.request_for(image)))
                .await?;
            debug!(item = image.index, total, url = %output.url, "Clip generated");
            videos.push(GeneratedVideo {
                index: image.index,
                source_image_url: image.url.clone(),
                url: output.url,
                duration_seconds: output
                    .duration_seconds
                    .or(self.duration_seconds.map(f64::from)),
            });
            ctx.item_generated(StageId::Videos, image.index, total).await;
        }

        Ok(StageArtifact::Videos { videos })
    }
}

impl std::fmt::Debug for VideoRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRunner")
            .field("motion_prompt", &self.motion_prompt)
            .field("duration_seconds", &self.duration_seconds)
            .finish_non_exhaustive()
    }
}
