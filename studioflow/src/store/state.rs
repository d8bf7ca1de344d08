//! Per-stage state and the serializable project snapshot.

use crate::core::{ArtifactStatus, StageArtifact, StageId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The state of a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    /// The stage.
    pub stage: StageId,
    /// Generation status.
    pub status: ArtifactStatus,
    /// Whether a person approved the artifact.
    pub approved: bool,
    /// The artifact, once generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<StageArtifact>,
    /// Error message of the last failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Run currently (or last) writing this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Last mutation (ISO 8601).
    pub updated_at: String,
}

impl StageState {
    /// Creates an empty, pending stage.
    #[must_use]
    pub fn pending(stage: StageId) -> Self {
        Self {
            stage,
            status: ArtifactStatus::Pending,
            approved: false,
            artifact: None,
            error: None,
            run_id: None,
            updated_at: crate::utils::iso_timestamp(),
        }
    }

    /// Returns the artifact only if the stage is approved.
    #[must_use]
    pub fn approved_artifact(&self) -> Option<&StageArtifact> {
        if self.approved {
            self.artifact.as_ref()
        } else {
            None
        }
    }

    /// Returns the stage to pending: artifact, error and approval cleared.
    pub fn clear(&mut self) {
        self.status = ArtifactStatus::Pending;
        self.approved = false;
        self.artifact = None;
        self.error = None;
        self.run_id = None;
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = crate::utils::iso_timestamp();
    }
}

/// A serializable copy of a whole project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Project id.
    pub project_id: Uuid,
    /// Human readable project name.
    pub name: String,
    /// Every stage, in pipeline order.
    pub stages: Vec<StageState>,
    /// When the snapshot was taken (ISO 8601).
    pub saved_at: String,
}

impl ProjectSnapshot {
    /// Returns the state of one stage.
    #[must_use]
    pub fn stage(&self, stage: StageId) -> Option<&StageState> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}
