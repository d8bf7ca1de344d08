//! Persistence backends for project snapshots.

use super::ProjectSnapshot;
use crate::errors::StudioError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Storage for project snapshots.
pub trait StoreBackend: Send + Sync + std::fmt::Debug {
    /// Loads a project, or `None` if it was never saved.
    fn load(&self, project_id: Uuid) -> Result<Option<ProjectSnapshot>, StudioError>;

    /// Saves (replaces) a project.
    fn save(&self, snapshot: &ProjectSnapshot) -> Result<(), StudioError>;

    /// Lists saved project ids.
    fn list(&self) -> Result<Vec<Uuid>, StudioError>;

    /// Deletes a project. Returns true if it existed.
    fn delete(&self, project_id: Uuid) -> Result<bool, StudioError>;
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    projects: RwLock<HashMap<Uuid, ProjectSnapshot>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self, project_id: Uuid) -> Result<Option<ProjectSnapshot>, StudioError> {
        Ok(self.projects.read().get(&project_id).cloned())
    }

    fn save(&self, snapshot: &ProjectSnapshot) -> Result<(), StudioError> {
        self.projects
            .write()
            .insert(snapshot.project_id, snapshot.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Uuid>, StudioError> {
        let mut ids: Vec<Uuid> = self.projects.read().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn delete(&self, project_id: Uuid) -> Result<bool, StudioError> {
        Ok(self.projects.write().remove(&project_id).is_some())
    }
}

/// One pretty-printed JSON document per project in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Creates a backend rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StudioError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory holding project files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, project_id: Uuid) -> PathBuf {
        self.dir.join(format!("{project_id}.json"))
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&self, project_id: Uuid) -> Result<Option<ProjectSnapshot>, StudioError> {
        let path = self.path_for(project_id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: ProjectSnapshot = serde_json::from_str(&raw)?;
        if snapshot.version > super::SNAPSHOT_VERSION {
            return Err(StudioError::Storage(format!(
                "{} has snapshot version {}, newer than supported {}",
                path.display(),
                snapshot.version,
                super::SNAPSHOT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &ProjectSnapshot) -> Result<(), StudioError> {
        let path = self.path_for(snapshot.project_id);
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", snapshot.project_id, crate::utils::generate_uuid()));
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %path.display(), "Saved project snapshot");
        Ok(())
    }

    fn list(&self) -> Result<Vec<Uuid>, StudioError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn delete(&self, project_id: Uuid) -> Result<bool, StudioError> {
        match std::fs::remove_file(self.path_for(project_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
