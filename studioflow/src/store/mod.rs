//! The pipeline stage store.
//!
//! Holds the artifact, status and approval flag of all six stages of one
//! project. Every mutation happens under a single write lock and, when a
//! backend is attached, is persisted before the call returns.

mod backend;
mod state;

pub use backend::{JsonFileBackend, MemoryBackend, StoreBackend};
pub use state::{ProjectSnapshot, StageState, SNAPSHOT_VERSION};

use crate::core::{ArtifactStatus, StageArtifact, StageId};
use crate::errors::{GateError, StudioError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-project stage store.
#[derive(Debug)]
pub struct PipelineStore {
    project_id: Uuid,
    name: String,
    stages: RwLock<BTreeMap<StageId, StageState>>,
    backend: Option<Arc<dyn StoreBackend>>,
}

impl PipelineStore {
    /// Creates a new in-memory project with every stage pending.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project_id: crate::utils::generate_uuid(),
            name: name.into(),
            stages: RwLock::new(
                StageId::ALL
                    .into_iter()
                    .map(|s| (s, StageState::pending(s)))
                    .collect(),
            ),
            backend: None,
        }
    }

    /// Attaches a backend and saves the current state to it.
    pub fn with_backend(mut self, backend: Arc<dyn StoreBackend>) -> Result<Self, StudioError> {
        self.backend = Some(backend);
        self.persist_current()?;
        Ok(self)
    }

    /// Loads a project from a backend.
    ///
    /// Stages saved mid-generation are marked as failed: the run that owned
    /// them no longer exists.
    pub fn load(backend: Arc<dyn StoreBackend>, project_id: Uuid) -> Result<Self, StudioError> {
        let snapshot = backend
            .load(project_id)?
            .ok_or_else(|| StudioError::Storage(format!("project {project_id} not found")))?;

        let mut stages: BTreeMap<StageId, StageState> = StageId::ALL
            .into_iter()
            .map(|s| (s, StageState::pending(s)))
            .collect();
        for mut state in snapshot.stages {
            if state.status == ArtifactStatus::Generating {
                warn!(stage = %state.stage, "Stage was generating when saved; marking as interrupted");
                state.status = ArtifactStatus::Error;
                state.error = Some("generation interrupted".to_string());
                state.run_id = None;
            }
            stages.insert(state.stage, state);
        }

        Ok(Self {
            project_id,
            name: snapshot.name,
            stages: RwLock::new(stages),
            backend: Some(backend),
        })
    }

    /// The project id.
    #[must_use]
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// The project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of one stage's state.
    #[must_use]
    pub fn state(&self, stage: StageId) -> StageState {
        self.stages
            .read()
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| StageState::pending(stage))
    }

    /// Returns the status of a stage.
    #[must_use]
    pub fn status(&self, stage: StageId) -> ArtifactStatus {
        self.stages
            .read()
            .get(&stage)
            .map_or(ArtifactStatus::Pending, |s| s.status)
    }

    /// Returns true if the stage is approved.
    #[must_use]
    pub fn is_approved(&self, stage: StageId) -> bool {
        self.stages.read().get(&stage).is_some_and(|s| s.approved)
    }

    /// Returns the artifact of a stage if it is approved.
    #[must_use]
    pub fn approved_artifact(&self, stage: StageId) -> Option<StageArtifact> {
        self.stages
            .read()
            .get(&stage)
            .and_then(|s| s.approved_artifact().cloned())
    }

    /// Upstream stages of `stage` that are not yet approved.
    #[must_use]
    pub fn unapproved_upstream(&self, stage: StageId) -> Vec<StageId> {
        let stages = self.stages.read();
        stage
            .upstream()
            .iter()
            .copied()
            .filter(|up| !stages.get(up).is_some_and(|s| s.approved))
            .collect()
    }

    /// Takes a serializable snapshot of the whole project.
    #[must_use]
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            version: SNAPSHOT_VERSION,
            project_id: self.project_id,
            name: self.name.clone(),
            stages: self.stages.read().values().cloned().collect(),
            saved_at: crate::utils::iso_timestamp(),
        }
    }

    /// Marks a stage as generating for `run_id`.
    ///
    /// Checks the upstream approvals under the same lock so a concurrent
    /// rejection cannot slip in between the check and the status change.
    /// Any previous artifact and approval are cleared: running a stage again
    /// is a regeneration.
    pub fn begin_generation(&self, stage: StageId, run_id: Uuid) -> Result<(), StudioError> {
        self.transact(|stages| {
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
            if state.status == ArtifactStatus::Generating {
                return Err(GateError::AlreadyGenerating { stage });
            }
            state.clear();
            state.status = ArtifactStatus::Generating;
            state.run_id = Some(run_id);
            Ok(())
        })
    }

    /// Stores a finished artifact. Returns false (and changes nothing) when
    /// the stage no longer belongs to `run_id`, e.g. after a rejection.
    pub fn complete(
        &self,
        stage: StageId,
        run_id: Uuid,
        artifact: StageArtifact,
    ) -> Result<bool, StudioError> {
        self.finish(stage, run_id, |state| {
            state.status = ArtifactStatus::Completed;
            state.artifact = Some(artifact);
            state.error = None;
        })
    }

    /// Records a failed run. Same ownership rule as [`Self::complete`].
    pub fn fail(
        &self,
        stage: StageId,
        run_id: Uuid,
        message: impl Into<String>,
    ) -> Result<bool, StudioError> {
        let message = message.into();
        self.finish(stage, run_id, |state| {
            state.status = ArtifactStatus::Error;
            state.artifact = None;
            state.error = Some(message);
        })
    }

    fn finish(
        &self,
        stage: StageId,
        run_id: Uuid,
        apply: impl FnOnce(&mut StageState),
    ) -> Result<bool, StudioError> {
        self.transact(|stages| {
            let state = stage_mut(stages, stage);
            if state.run_id != Some(run_id) || state.status != ArtifactStatus::Generating {
                debug!(stage = %stage, run_id = %run_id, "Discarding result of stale run");
                return Ok(false);
            }
            apply(state);
            state.touch();
            Ok(true)
        })
    }

    /// Runs `f` against a copy of the stage map, persists the copy, and only
    /// then makes it live.
    ///
    /// The write lock is held across the save so snapshots reach the backend
    /// in the order their changes were made. A failed save leaves the store
    /// unchanged.
    pub(crate) fn transact<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<StageId, StageState>) -> Result<T, GateError>,
    ) -> Result<T, StudioError> {
        let mut stages = self.stages.write();
        let mut next = stages.clone();
        let value = f(&mut next)?;

        if let Some(backend) = &self.backend {
            backend.save(&ProjectSnapshot {
                version: SNAPSHOT_VERSION,
                project_id: self.project_id,
                name: self.name.clone(),
                stages: next.values().cloned().collect(),
                saved_at: crate::utils::iso_timestamp(),
            })?;
        }
        *stages = next;
        Ok(value)
    }

    fn persist_current(&self) -> Result<(), StudioError> {
        if let Some(backend) = &self.backend {
            backend.save(&self.snapshot())?;
        }
        Ok(())
    }
}

pub(crate) fn stage_mut(
    stages: &mut BTreeMap<StageId, StageState>,
    stage: StageId,
) -> &mut StageState {
    stages
        .entry(stage)
        .or_insert_with(|| StageState::pending(stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn completed_script(store: &PipelineStore) -> Uuid {
        let run = crate::utils::generate_uuid_v7();
        store.begin_generation(StageId::Script, run).unwrap();
        assert!(store
            .complete(StageId::Script, run, StageArtifact::script("Hello there."))
            .unwrap());
        run
    }

    #[test]
    fn test_new_store_all_pending() {
        let store = PipelineStore::new("demo");
        for stage in StageId::ALL {
            let state = store.state(stage);
            assert_eq!(state.status, ArtifactStatus::Pending);
            assert!(!state.approved);
            assert!(state.artifact.is_none());
        }
        assert_eq!(store.snapshot().stages.len(), 6);
    }

    #[test]
    fn test_begin_generation_blocked_by_upstream() {
        let store = PipelineStore::new("demo");
        let err = store
            .begin_generation(StageId::Narration, Uuid::nil())
            .unwrap_err();

        assert!(matches!(
            err,
            StudioError::Gate(GateError::UpstreamNotApproved { stage: StageId::Narration, ref missing })
                if missing == &vec![StageId::Script]
        ));
        assert_eq!(store.status(StageId::Narration), ArtifactStatus::Pending);
    }

    #[test]
    fn test_begin_generation_twice_rejected() {
        let store = PipelineStore::new("demo");
        store.begin_generation(StageId::Script, Uuid::nil()).unwrap();
        let err = store.begin_generation(StageId::Script, Uuid::nil()).unwrap_err();
        assert!(matches!(err, StudioError::Gate(GateError::AlreadyGenerating { .. })));
    }

    #[test]
    fn test_complete_and_fail() {
        let store = PipelineStore::new("demo");
        completed_script(&store);
        assert_eq!(store.status(StageId::Script), ArtifactStatus::Completed);

        let run = crate::utils::generate_uuid_v7();
        store.begin_generation(StageId::Script, run).unwrap();
        assert!(store.state(StageId::Script).artifact.is_none());
        assert!(store.fail(StageId::Script, run, "quota exceeded").unwrap());

        let state = store.state(StageId::Script);
        assert_eq!(state.status, ArtifactStatus::Error);
        assert_eq!(state.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_stale_run_is_discarded() {
        let store = PipelineStore::new("demo");
        let run = crate::utils::generate_uuid_v7();
        store.begin_generation(StageId::Script, run).unwrap();

        let other = crate::utils::generate_uuid_v7();
        assert!(!store
            .complete(StageId::Script, other, StageArtifact::script("x"))
            .unwrap());
        assert_eq!(store.status(StageId::Script), ArtifactStatus::Generating);
    }

    #[test]
    fn test_backend_persists_every_mutation() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PipelineStore::new("demo").with_backend(backend.clone()).unwrap();
        completed_script(&store);

        let saved = backend.load(store.project_id()).unwrap().unwrap();
        assert_eq!(
            saved.stage(StageId::Script).unwrap().status,
            ArtifactStatus::Completed
        );
    }

    #[test]
    fn test_load_marks_generating_as_interrupted() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PipelineStore::new("demo").with_backend(backend.clone()).unwrap();
        store.begin_generation(StageId::Script, Uuid::nil()).unwrap();

        let reloaded = PipelineStore::load(backend, store.project_id()).unwrap();
        let state = reloaded.state(StageId::Script);
        assert_eq!(state.status, ArtifactStatus::Error);
        assert_eq!(state.error.as_deref(), Some("generation interrupted"));
        assert_eq!(reloaded.name(), "demo");
    }

    #[test]
    fn test_json_file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(JsonFileBackend::new(dir.path().join("projects")).unwrap());
        let store = PipelineStore::new("file demo")
            .with_backend(backend.clone())
            .unwrap();
        completed_script(&store);

        assert_eq!(backend.list().unwrap(), vec![store.project_id()]);
        let reloaded = PipelineStore::load(backend.clone(), store.project_id()).unwrap();
        assert_eq!(reloaded.state(StageId::Script), store.state(StageId::Script));

        assert!(backend.delete(store.project_id()).unwrap());
        assert!(!backend.delete(store.project_id()).unwrap());
        assert!(backend.load(store.project_id()).unwrap().is_none());
    }

    /// Memory backend whose next `save` can be made to fail.
    #[derive(Debug, Default)]
    struct FailingBackend {
        inner: MemoryBackend,
        fail_next: std::sync::atomic::AtomicBool,
    }

    impl FailingBackend {
        fn fail_next_save(&self) {
            self.fail_next
                .store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl StoreBackend for FailingBackend {
        fn load(&self, project_id: Uuid) -> Result<Option<ProjectSnapshot>, StudioError> {
            self.inner.load(project_id)
        }

        fn save(&self, snapshot: &ProjectSnapshot) -> Result<(), StudioError> {
            if self.fail_next.swap(false, std::sync::atomic::Ordering::SeqCst) {
                return Err(StudioError::Storage("disk full".to_string()));
            }
            self.inner.save(snapshot)
        }

        fn list(&self) -> Result<Vec<Uuid>, StudioError> {
            self.inner.list()
        }

        fn delete(&self, project_id: Uuid) -> Result<bool, StudioError> {
            self.inner.delete(project_id)
        }
    }

    #[test]
    fn test_failed_save_leaves_stage_untouched() {
        let backend = Arc::new(FailingBackend::default());
        let store = PipelineStore::new("demo").with_backend(backend.clone()).unwrap();

        backend.fail_next_save();
        let err = store
            .begin_generation(StageId::Script, crate::utils::generate_uuid_v7())
            .unwrap_err();
        assert!(matches!(err, StudioError::Storage(_)));

        let state = store.state(StageId::Script);
        assert_eq!(state.status, ArtifactStatus::Pending);
        assert!(state.run_id.is_none());

        // The stage is not stuck: the next run may start.
        completed_script(&store);
        assert_eq!(store.status(StageId::Script), ArtifactStatus::Completed);
    }

    #[test]
    fn test_failed_save_does_not_approve() {
        let backend = Arc::new(FailingBackend::default());
        let store = Arc::new(PipelineStore::new("demo").with_backend(backend.clone()).unwrap());
        completed_script(&store);
        let gate = crate::gate::ApprovalGate::new(store.clone());

        backend.fail_next_save();
        assert!(gate.approve(StageId::Script).is_err());

        assert!(!store.is_approved(StageId::Script));
        let saved = backend.load(store.project_id()).unwrap().unwrap();
        assert!(!saved.stage(StageId::Script).unwrap().approved);

        gate.approve(StageId::Script).unwrap();
        assert!(store.is_approved(StageId::Script));
    }

    #[test]
    fn test_concurrent_writes_persist_latest_state() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(JsonFileBackend::new(dir.path()).unwrap());
        let store = Arc::new(PipelineStore::new("busy").with_backend(backend.clone()).unwrap());
        let gate = crate::gate::ApprovalGate::new(store.clone());

        std::thread::scope(|scope| {
            for stage in [StageId::Narration, StageId::ImagePrompts, StageId::Images, StageId::Videos] {
                let gate = gate.clone();
                scope.spawn(move || {
                    for _ in 0..25 {
                        gate.reject(stage).unwrap();
                    }
                });
            }
        });

        let saved = backend.load(store.project_id()).unwrap().unwrap();
        assert_eq!(saved.stages, store.snapshot().stages);

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_load_missing_project() {
        let backend = Arc::new(MemoryBackend::new());
        let err = PipelineStore::load(backend, Uuid::nil()).unwrap_err();
        assert!(matches!(err, StudioError::Storage(_)));
    }
}
