//! Approval gate.
//!
//! A stage may only be approved once its artifact is complete and every
//! upstream stage is approved. Rejecting a stage clears it back to pending
//! and leaves every other stage untouched.

use crate::core::{ArtifactStatus, StageEvent, StageId};
use crate::errors::{GateError, StudioError};
use crate::events::{EventSink, NoOpEventSink};
use crate::store::{stage_mut, PipelineStore};
use std::sync::Arc;
use tracing::info;

/// Approves and rejects stages of one project.
#[derive(Clone)]
pub struct ApprovalGate {
    store: Arc<PipelineStore>,
    events: Arc<dyn EventSink>,
}

impl ApprovalGate {
    /// Creates a gate over `store` that emits no events.
    #[must_use]
    pub fn new(store: Arc<PipelineStore>) -> Self {
        Self {
            store,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns true if every upstream stage of `stage` is approved.
    #[must_use]
    pub fn can_run(&self, stage: StageId) -> bool {
        self.store.unapproved_upstream(stage).is_empty()
    }

    /// Approves `stage`.
    ///
    /// Approving an already approved stage is a no-op.
    pub fn approve(&self, stage: StageId) -> Result<(), StudioError> {
        self.store.transact(|stages| {
            let missing: Vec<StageId> = stage
                .upstream()
                .iter()
                .copied()
                .filter(|up| !stages.get(up).is_some_and(|s| s.approved))
                .collect();
            if !missing.is_empty() {
                return Err(GateError::UpstreamNotApproved { stage, missing });
            }

            let state = stage_mut(stages, stage);
            if state.status != ArtifactStatus::Completed || state.artifact.is_none() {
                return Err(GateError::ArtifactNotReady {
                    stage,
                    status: state.status,
                });
            }
            if !state.approved {
                state.approved = true;
                state.touch();
            }
            Ok(())
        })?;

        info!(stage = %stage, project = %self.store.project_id(), "Stage approved");
        self.events.try_emit(StageEvent::approved(stage));
        Ok(())
    }

    /// Rejects `stage`: clears its artifact, error and approval.
    ///
    /// Downstream artifacts are kept, but downstream runners are blocked
    /// again until this stage is regenerated and approved. A rejection
    /// during generation orphans the in-flight run; its result is dropped.
    pub fn reject(&self, stage: StageId) -> Result<(), StudioError> {
        self.store.transact(|stages| {
            stage_mut(stages, stage).clear();
            Ok(())
        })?;

        info!(stage = %stage, project = %self.store.project_id(), "Stage rejected");
        self.events.try_emit(StageEvent::rejected(stage));
        Ok(())
    }
}

impl std::fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("project_id", &self.store.project_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GeneratedImage, ImagePrompt, StageArtifact};
    use crate::events::CollectingEventSink;
    use pretty_assertions::assert_eq;

    fn complete(store: &PipelineStore, stage: StageId, artifact: StageArtifact) {
        let run = crate::utils::generate_uuid_v7();
        store.begin_generation(stage, run).unwrap();
        store.complete(stage, run, artifact).unwrap();
    }

    fn prompts() -> StageArtifact {
        StageArtifact::ImagePrompts {
            prompts: vec![ImagePrompt {
                index: 0,
                scene: None,
                prompt: "a lighthouse".to_string(),
            }],
        }
    }

    fn images() -> StageArtifact {
        StageArtifact::Images {
            images: vec![GeneratedImage {
                index: 0,
                prompt: "a lighthouse".to_string(),
                url: "https://cdn.example/0.png".to_string(),
                width: None,
                height: None,
            }],
        }
    }

    #[test]
    fn test_approve_requires_completed_artifact() {
        let store = Arc::new(PipelineStore::new("demo"));
        let gate = ApprovalGate::new(store.clone());

        let err = gate.approve(StageId::Script).unwrap_err();
        assert!(matches!(
            err,
            StudioError::Gate(GateError::ArtifactNotReady {
                status: ArtifactStatus::Pending,
                ..
            })
        ));
        assert!(!store.is_approved(StageId::Script));
    }

    #[test]
    fn test_approve_rejected_when_upstream_unapproved() {
        let store = Arc::new(PipelineStore::new("demo"));
        let gate = ApprovalGate::new(store.clone());

        complete(&store, StageId::Script, StageArtifact::script("One. \n\nTwo."));
        gate.approve(StageId::Script).unwrap();
        complete(&store, StageId::ImagePrompts, prompts());
        gate.approve(StageId::ImagePrompts).unwrap();
        complete(&store, StageId::Images, images());

        gate.reject(StageId::ImagePrompts).unwrap();

        let err = gate.approve(StageId::Images).unwrap_err();
        assert!(matches!(
            err,
            StudioError::Gate(GateError::UpstreamNotApproved { stage: StageId::Images, .. })
        ));
        assert!(!store.is_approved(StageId::Images));
    }

    #[test]
    fn test_every_stage_requires_upstream_approval() {
        for stage in StageId::ALL.into_iter().filter(|s| !s.upstream().is_empty()) {
            let store = Arc::new(PipelineStore::new("demo"));
            let gate = ApprovalGate::new(store);
            assert!(!gate.can_run(stage));
            assert!(gate.approve(stage).is_err(), "{stage} approved without upstream");
        }
    }

    #[test]
    fn test_reject_clears_only_that_stage() {
        let store = Arc::new(PipelineStore::new("demo"));
        let events = Arc::new(CollectingEventSink::new());
        let gate = ApprovalGate::new(store.clone()).with_events(events.clone());

        complete(&store, StageId::Script, StageArtifact::script("Scene."));
        gate.approve(StageId::Script).unwrap();
        complete(
            &store,
            StageId::Narration,
            StageArtifact::Narration {
                audio_url: "https://cdn.example/n.mp3".to_string(),
                voice_id: "v".to_string(),
                duration_seconds: None,
            },
        );
        gate.approve(StageId::Narration).unwrap();
        complete(&store, StageId::ImagePrompts, prompts());

        let sibling_before = store.state(StageId::ImagePrompts);
        gate.reject(StageId::Narration).unwrap();

        let narration = store.state(StageId::Narration);
        assert!(narration.artifact.is_none());
        assert!(!narration.approved);
        assert_eq!(narration.status, ArtifactStatus::Pending);

        assert_eq!(store.state(StageId::ImagePrompts), sibling_before);
        assert!(store.is_approved(StageId::Script));
        assert_eq!(
            events.event_types(),
            vec!["stage.approved", "stage.approved", "stage.rejected"]
        );
    }

    #[test]
    fn test_reject_upstream_blocks_downstream_runs() {
        let store = Arc::new(PipelineStore::new("demo"));
        let gate = ApprovalGate::new(store.clone());

        complete(&store, StageId::Script, StageArtifact::script("Scene."));
        gate.approve(StageId::Script).unwrap();
        assert!(gate.can_run(StageId::Narration));

        gate.reject(StageId::Script).unwrap();
        assert!(!gate.can_run(StageId::Narration));
        assert!(gate.can_run(StageId::Script));
    }

    #[test]
    fn test_approve_is_idempotent() {
        let store = Arc::new(PipelineStore::new("demo"));
        let gate = ApprovalGate::new(store.clone());
        complete(&store, StageId::Script, StageArtifact::script("Scene."));

        gate.approve(StageId::Script).unwrap();
        gate.approve(StageId::Script).unwrap();
        assert!(store.is_approved(StageId::Script));
    }
}
