//! Narration synthesis.

use super::{RunContext, RunnerInputs, StageRunner};
use crate::core::{StageArtifact, StageId};
use crate::errors::StudioError;
use crate::providers::{encode_data_url, SpeechSynthesizer};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reads the approved script aloud.
///
/// The audio is stored inline as a `data:` URL since speech providers return
/// bytes rather than a hosted file.
pub struct NarrationRunner {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voice_id: String,
}

impl NarrationRunner {
    /// Creates a runner using `voice_id`.
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, voice_id: impl Into<String>) -> Self {
        Self {
            synthesizer,
            voice_id: voice_id.into(),
        }
    }
}

#[async_trait]
impl StageRunner for NarrationRunner {
    fn stage(&self) -> StageId {
        StageId::Narration
    }

    async fn run(&self, inputs: &RunnerInputs, ctx: &RunContext) -> Result<StageArtifact, StudioError> {
        let (text, _) = inputs.script()?;
        ctx.check_cancelled()?;

        let speech = ctx
            .guard(self.synthesizer.synthesize(text, &self.voice_id))
            .await?;
        debug!(bytes = speech.audio.len(), mime = %speech.mime_type, "Narration synthesized");

        Ok(StageArtifact::Narration {
            audio_url: encode_data_url(&speech.mime_type, &speech.audio),
            voice_id: self.voice_id.clone(),
            duration_seconds: None,
        })
    }
}

impl std::fmt::Debug for NarrationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationRunner")
            .field("voice_id", &self.voice_id)
            .finish_non_exhaustive()
    }
}
