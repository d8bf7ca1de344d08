//! Image prompt generation, one prompt per scene.

use super::{RunContext, RunnerInputs, StageRunner};
use crate::core::{ImagePrompt, StageArtifact, StageId};
use crate::errors::StudioError;
use crate::providers::{TextGenerator, TextRequest};
use crate::utils::parse_numbered_list;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_SYSTEM: &str = "You write prompts for a text-to-image model. \
Each prompt describes a single cinematic frame: subject, setting, lighting and camera. \
Answer with a numbered list and nothing else.";

/// Turns the approved script into visual prompts.
pub struct ImagePromptRunner {
    generator: Arc<dyn TextGenerator>,
    style: Option<String>,
}

impl ImagePromptRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            style: None,
        }
    }

    /// Appends a visual style to every prompt request (e.g. "watercolor").
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    fn request(&self, scenes: &[String]) -> TextRequest {
        let mut prompt = format!(
            "Write exactly {} image prompts, one for each scene below, in order.\n",
            scenes.len()
        );
        if let Some(style) = &self.style {
            prompt.push_str(&format!("Visual style: {style}.\n"));
        }
        for (i, scene) in scenes.iter().enumerate() {
            prompt.push_str(&format!("\nScene {}: {}", i + 1, scene));
        }
        TextRequest::new(DEFAULT_SYSTEM, prompt).with_temperature(0.7)
    }
}

/// Pairs parsed prompts with their scenes. Extra prompts are dropped.
fn pair_with_scenes(parsed: Vec<String>, scenes: &[String]) -> Vec<ImagePrompt> {
    let limit = if scenes.is_empty() { parsed.len() } else { scenes.len() };
    parsed
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, prompt)| ImagePrompt {
            index,
            scene: scenes.get(index).cloned(),
            prompt,
        })
        .collect()
}

#[async_trait]
impl StageRunner for ImagePromptRunner {
    fn stage(&self) -> StageId {
        StageId::ImagePrompts
    }

    async fn run(&self, inputs: &RunnerInputs, ctx: &RunContext) -> Result<StageArtifact, StudioError> {
        let (text, scenes) = inputs.script()?;
        let scenes: Vec<String> = if scenes.is_empty() {
            vec![text.to_string()]
        } else {
            scenes.to_vec()
        };
        ctx.check_cancelled()?;

        let raw = ctx.guard(self.generator.generate(&self.request(&scenes))).await?;
        let parsed = parse_numbered_list(&raw);
        if parsed.is_empty() {
            return Err(StudioError::invalid_artifact(
                StageId::ImagePrompts,
                "model returned no prompts",
            ));
        }
        if parsed.len() < scenes.len() {
            warn!(expected = scenes.len(), got = parsed.len(), "Fewer prompts than scenes");
        }

        let prompts = pair_with_scenes(parsed, &scenes);
        debug!(count = prompts.len(), "Image prompts parsed");
        Ok(StageArtifact::ImagePrompts { prompts })
    }
}

impl std::fmt::Debug for ImagePromptRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePromptRunner")
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}
