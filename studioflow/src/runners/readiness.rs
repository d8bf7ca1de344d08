//! Export readiness check.

use super::{RunContext, RunnerInputs, StageRunner};
use crate::core::{StageArtifact, StageId};
use crate::errors::StudioError;
use async_trait::async_trait;

/// Counts the approved assets an export would bundle.
///
/// Calls no provider. Fails when there is nothing to export.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportReadinessRunner;

impl ExportReadinessRunner {
    /// Creates the runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageRunner for ExportReadinessRunner {
    fn stage(&self) -> StageId {
        StageId::Export
    }

    async fn run(&self, inputs: &RunnerInputs, ctx: &RunContext) -> Result<StageArtifact, StudioError> {
        ctx.check_cancelled()?;

        let items: usize = StageId::Export
            .upstream()
            .iter()
            .filter_map(|stage| inputs.get(*stage).ok())
            .map(StageArtifact::item_count)
            .sum();

        if items == 0 {
            return Err(StudioError::invalid_artifact(
                StageId::Export,
                "no approved assets to export",
            ));
        }

        Ok(StageArtifact::ExportReadiness {
            items,
            checked_at: crate::utils::iso_timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GeneratedImage;

    #[tokio::test]
    async fn test_counts_upstream_items() {
        let image = GeneratedImage {
            index: 0,
            prompt: "p".to_string(),
            url: "https://img/0.png".to_string(),
            width: None,
            height: None,
        };
        let inputs = RunnerInputs::new(
            StageId::Export,
            [
                StageArtifact::Narration {
                    audio_url: "data:audio/mpeg;base64,AA==".to_string(),
                    voice_id: "v".to_string(),
                    duration_seconds: None,
                },
                StageArtifact::Images {
                    images: vec![image.clone(), GeneratedImage { index: 1, ..image }],
                },
            ],
        );

        let artifact = ExportReadinessRunner::new()
            .run(&inputs, &RunContext::new())
            .await
            .unwrap();
        assert_eq!(artifact.item_count(), 3);
    }

    #[tokio::test]
    async fn test_nothing_to_export() {
        let err = ExportReadinessRunner::new()
            .run(&RunnerInputs::new(StageId::Export, []), &RunContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_artifact");
    }
}
