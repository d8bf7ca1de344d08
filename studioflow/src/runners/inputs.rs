//! Approved upstream artifacts handed to a runner.

use crate::core::{GeneratedImage, ImagePrompt, StageArtifact, StageId};
use crate::errors::StudioError;
use std::collections::BTreeMap;

/// An immutable view of the approved artifacts a stage depends on.
///
/// Only declared upstream stages are reachable; asking for anything else is
/// an error even if the artifact exists.
#[derive(Debug, Clone, Default)]
pub struct RunnerInputs {
    stage: Option<StageId>,
    artifacts: BTreeMap<StageId, StageArtifact>,
}

impl RunnerInputs {
    /// Creates inputs for `stage`, keeping only its declared upstream.
    #[must_use]
    pub fn new(stage: StageId, artifacts: impl IntoIterator<Item = StageArtifact>) -> Self {
        let artifacts = artifacts
            .into_iter()
            .filter(|a| stage.upstream().contains(&a.stage()))
            .map(|a| (a.stage(), a))
            .collect();
        Self {
            stage: Some(stage),
            artifacts,
        }
    }

    /// Stages whose artifacts are present.
    pub fn available(&self) -> impl Iterator<Item = StageId> + '_ {
        self.artifacts.keys().copied()
    }

    /// Returns the approved artifact of `upstream`.
    pub fn get(&self, upstream: StageId) -> Result<&StageArtifact, StudioError> {
        let stage = self.stage.unwrap_or(upstream);
        if !stage.upstream().contains(&upstream) {
            return Err(StudioError::invalid_artifact(
                stage,
                format!("{upstream} is not an upstream stage of {stage}"),
            ));
        }
        self.artifacts.get(&upstream).ok_or_else(|| {
            StudioError::invalid_artifact(stage, format!("no approved {upstream} artifact"))
        })
    }

    /// The approved script text and its scenes.
    pub fn script(&self) -> Result<(&str, &[String]), StudioError> {
        match self.get(StageId::Script)? {
            StageArtifact::Script { text, scenes } => Ok((text, scenes)),
            other => Err(self.mismatch(StageId::Script, other)),
        }
    }

    /// The approved image prompts.
    pub fn prompts(&self) -> Result<&[ImagePrompt], StudioError> {
        match self.get(StageId::ImagePrompts)? {
            StageArtifact::ImagePrompts { prompts } => Ok(prompts),
            other => Err(self.mismatch(StageId::ImagePrompts, other)),
        }
    }

    /// The approved images.
    pub fn images(&self) -> Result<&[GeneratedImage], StudioError> {
        match self.get(StageId::Images)? {
            StageArtifact::Images { images } => Ok(images),
            other => Err(self.mismatch(StageId::Images, other)),
        }
    }

    fn mismatch(&self, expected: StageId, found: &StageArtifact) -> StudioError {
        StudioError::invalid_artifact(
            self.stage.unwrap_or(expected),
            format!("expected a {expected} artifact, found {}", found.stage()),
        )
    }
}
