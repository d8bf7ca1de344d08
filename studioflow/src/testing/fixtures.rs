//! Sample artifacts and store fixtures.

use std::sync::Arc;

use crate::core::{GeneratedImage, GeneratedVideo, ImagePrompt, StageArtifact, StageId};
use crate::errors::StudioError;
use crate::gate::ApprovalGate;
use crate::providers::encode_data_url;
use crate::store::PipelineStore;

/// A small, valid artifact for `stage`.
///
/// Two scenes, two prompts, two images and two clips, so every batch stage
/// has more than one item.
#[must_use]
pub fn sample_artifact(stage: StageId) -> StageArtifact {
    match stage {
        StageId::Script => StageArtifact::script("A hiker reaches the summit.\n\nThe backpack charges a phone."),
        StageId::Narration => StageArtifact::Narration {
            audio_url: encode_data_url("audio/mpeg", b"ID3sample"),
            voice_id: "sample-voice".to_string(),
            duration_seconds: Some(12.5),
        },
        StageId::ImagePrompts => StageArtifact::ImagePrompts {
            prompts: (0..2)
                .map(|index| ImagePrompt {
                    index,
                    scene: None,
                    prompt: format!("sample frame {index}"),
                })
                .collect(),
        },
        StageId::Images => StageArtifact::Images {
            images: (0..2)
                .map(|index| GeneratedImage {
                    index,
                    prompt: format!("sample frame {index}"),
                    url: format!("https://images.test/{index}.png"),
                    width: Some(1024),
                    height: Some(576),
                })
                .collect(),
        },
        StageId::Videos => StageArtifact::Videos {
            videos: (0..2)
                .map(|index| GeneratedVideo {
                    index,
                    source_image_url: format!("https://images.test/{index}.png"),
                    url: format!("https://videos.test/{index}.mp4"),
                    duration_seconds: Some(5.0),
                })
                .collect(),
        },
        StageId::Export => StageArtifact::ExportReadiness {
            items: 5,
            checked_at: crate::utils::iso_timestamp(),
        },
    }
}

/// Stores `artifact` on `stage` as a completed, unapproved run.
pub fn complete_stage(
    store: &PipelineStore,
    stage: StageId,
    artifact: StageArtifact,
) -> Result<(), StudioError> {
    let run_id = crate::utils::generate_uuid_v7();
    store.begin_generation(stage, run_id)?;
    store.complete(stage, run_id, artifact)?;
    Ok(())
}

/// Completes and approves every stage up to and including `last`, in
/// pipeline order, with [`sample_artifact`]s.
pub fn approve_through(store: &Arc<PipelineStore>, last: StageId) -> Result<(), StudioError> {
    let gate = ApprovalGate::new(Arc::clone(store));
    for stage in StageId::ALL.into_iter().filter(|s| *s <= last) {
        complete_stage(store, stage, sample_artifact(stage))?;
        gate.approve(stage)?;
    }
    Ok(())
}
