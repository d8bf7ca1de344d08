//! Runs a stage runner against the store.

use super::{RunContext, RunnerInputs, StageRunner};
use crate::core::{StageArtifact, StageEvent, StageId};
use crate::errors::StudioError;
use crate::events::{EventSink, NoOpEventSink};
use crate::gate::ApprovalGate;
use crate::store::PipelineStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Owns the lifecycle shared by every stage: gate check, `generating`,
/// runner call, then `completed` or `error`.
#[derive(Clone)]
pub struct StageDriver {
    store: Arc<PipelineStore>,
    events: Arc<dyn EventSink>,
}

impl StageDriver {
    /// Creates a driver over `store` reporting to `events`.
    #[must_use]
    pub fn new(store: Arc<PipelineStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// Creates a driver that discards events.
    #[must_use]
    pub fn silent(store: Arc<PipelineStore>) -> Self {
        Self::new(store, Arc::new(NoOpEventSink))
    }

    /// The store this driver writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<PipelineStore> {
        &self.store
    }

    /// An approval gate over the same store and sink.
    #[must_use]
    pub fn gate(&self) -> ApprovalGate {
        ApprovalGate::new(Arc::clone(&self.store)).with_events(Arc::clone(&self.events))
    }

    /// Runs `runner` and records its outcome.
    ///
    /// Gate violations are returned before anything changes. Once the stage
    /// is marked generating, every failure is recorded on the stage as
    /// `error` and reported as `stage.failed` before being returned.
    pub async fn run<R>(&self, runner: &R, ctx: &RunContext) -> Result<StageArtifact, StudioError>
    where
        R: StageRunner + ?Sized,
    {
        let stage = runner.stage();
        let run_id = crate::utils::generate_uuid_v7();

        self.store.begin_generation(stage, run_id)?;

        let inputs = RunnerInputs::new(
            stage,
            stage
                .upstream()
                .iter()
                .filter_map(|up| self.store.approved_artifact(*up)),
        );
        let ctx = ctx.for_run(run_id, Arc::clone(&self.events));

        info!(stage = %stage, run_id = %run_id, "Stage started");
        self.events.emit(StageEvent::started(stage)).await;

        let start = Instant::now();
        let outcome = match runner.run(&inputs, &ctx).await {
            Ok(artifact) => validate(stage, artifact),
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(artifact) => {
                if !self.store.complete(stage, run_id, artifact.clone())? {
                    return Err(superseded(stage));
                }
                info!(
                    stage = %stage,
                    run_id = %run_id,
                    items = artifact.item_count(),
                    duration_ms,
                    "Stage completed"
                );
                self.events
                    .emit(StageEvent::completed(stage, artifact.item_count(), duration_ms))
                    .await;
                Ok(artifact)
            }
            Err(e) => {
                let message = e.to_string();
                if !self.store.fail(stage, run_id, &message)? {
                    return Err(superseded(stage));
                }
                warn!(stage = %stage, run_id = %run_id, error = %message, "Stage failed");
                let mut event = StageEvent::failed(stage, &message)
                    .add_data("duration_ms", serde_json::json!(duration_ms));
                for (key, value) in e.to_dict() {
                    if key != "message" {
                        event = event.add_data(key, value);
                    }
                }
                self.events.emit(event).await;
                Err(e)
            }
        }
    }
}

fn validate(stage: StageId, artifact: StageArtifact) -> Result<StageArtifact, StudioError> {
    if artifact.stage() != stage {
        return Err(StudioError::invalid_artifact(
            stage,
            format!("runner produced a {} artifact", artifact.stage()),
        ));
    }
    if artifact.is_empty() {
        return Err(StudioError::invalid_artifact(stage, "runner produced an empty artifact"));
    }
    Ok(artifact)
}

fn superseded(stage: StageId) -> StudioError {
    StudioError::Cancelled(format!("run of '{stage}' was superseded before it finished"))
}

impl std::fmt::Debug for StageDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDriver")
            .field("project_id", &self.store.project_id())
            .finish_non_exhaustive()
    }
}
