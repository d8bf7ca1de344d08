//! Script generation.

use super::{RunContext, RunnerInputs, StageRunner};
use crate::core::{StageArtifact, StageId};
use crate::errors::StudioError;
use crate::providers::{TextGenerator, TextRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_SYSTEM: &str = "You are a scriptwriter for short-form social video. \
Write narration only, in plain prose, with no stage directions or speaker labels. \
Separate scenes with a blank line.";

/// Writes the narration script from a creative brief.
pub struct ScriptRunner {
    generator: Arc<dyn TextGenerator>,
    brief: String,
    system: String,
    temperature: Option<f32>,
}

impl ScriptRunner {
    /// Creates a runner for `brief`.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, brief: impl Into<String>) -> Self {
        Self {
            generator,
            brief: brief.into(),
            system: DEFAULT_SYSTEM.to_string(),
            temperature: Some(0.8),
        }
    }

    /// Replaces the system instruction.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn request(&self) -> TextRequest {
        let mut request = TextRequest::new(
            self.system.as_str(),
            format!("Write a video narration script for this brief:\n\n{}", self.brief.trim()),
        );
        request.temperature = self.temperature;
        request
    }
}

#[async_trait]
impl StageRunner for ScriptRunner {
    fn stage(&self) -> StageId {
        StageId::Script
    }

    async fn run(&self, _inputs: &RunnerInputs, ctx: &RunContext) -> Result<StageArtifact, StudioError> {
        if self.brief.trim().is_empty() {
            return Err(StudioError::invalid_artifact(StageId::Script, "brief is empty"));
        }
        ctx.check_cancelled()?;

        let text = ctx.guard(self.generator.generate(&self.request())).await?;
        debug!(chars = text.len(), "Script generated");
        Ok(StageArtifact::script(text.trim()))
    }
}

impl std::fmt::Debug for ScriptRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("brief", &self.brief)
            .finish_non_exhaustive()
    }
}
