use thiserror::Error;
use tracing::{debug, info};

use crate::{
    models::project::{DEFAULT_THUMBNAIL, Project, Status},
    services::ids::generate_id,
    storage::{Database, Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project '{0}' not found")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Project records in the store. Permission checks are the caller's job.
pub struct ProjectRepository<'a, S: Storage> {
    db: &'a Database<S>,
}

impl<'a, S: Storage> ProjectRepository<'a, S> {
    pub fn new(db: &'a Database<S>) -> Self {
        Self { db }
    }

    /// Every project, active and archived, in store order.
    pub fn list_all(&self) -> Result<Vec<Project>, StorageError> {
        let store = self.db.snapshot()?;
        Ok(store.projects.into_values().collect())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Project, ProjectError> {
        let mut store = self.db.snapshot()?;
        store
            .projects
            .remove(id)
            .ok_or_else(|| ProjectError::NotFound(id.to_string()))
    }

    /// Fails with `AlreadyExists` when a project is stored under `id`.
    pub fn ensure_vacant(&self, id: &str) -> Result<(), SaveProjectError> {
        match self.get_by_id(id) {
            Ok(_) => Err(SaveProjectError::AlreadyExists(id.to_string())),
            Err(ProjectError::NotFound(_)) => Ok(()),
            Err(ProjectError::Storage(e)) => Err(e.into()),
        }
    }

    /// Inserts the project, or fully replaces the record with the same id.
    pub fn put(&self, project: Project) -> Result<(), StorageError> {
        let id = project.id.clone();
        let replaced = self
            .db
            .update(|store| Some(store.projects.insert(project.id.clone(), project).is_some()))?;
        debug!(project = %id, replaced = replaced.unwrap_or(false), "Stored project");
        Ok(())
    }

    /// Hides the project from clients. Returns false when there is no such project.
    pub fn archive(&self, id: &str) -> Result<bool, StorageError> {
        self.set_archived(id, true)
    }

    /// Returns false when there is no such project.
    pub fn restore(&self, id: &str) -> Result<bool, StorageError> {
        self.set_archived(id, false)
    }

    /// Permanently removes the project whatever its archive state. Returns
    /// false when there was nothing to remove.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let removed = self
            .db
            .update(|store| store.projects.remove(id).map(|_| ()))?
            .is_some();
        if removed {
            info!(project = %id, "Deleted project");
        }
        Ok(removed)
    }

    fn set_archived(&self, id: &str, archived: bool) -> Result<bool, StorageError> {
        let found = self
            .db
            .update(|store| {
                let project = store.get_project_mut(id)?;
                project.is_archived = archived;
                Some(())
            })?
            .is_some();
        if found {
            info!(project = %id, archived, "Changed project archive state");
        } else {
            debug!(project = %id, "No project to change archive state of");
        }
        Ok(found)
    }
}

#[derive(Debug, Error)]
pub enum SaveProjectError {
    #[error("Project name is required")]
    MissingName,

    #[error("Client access code is required")]
    MissingAccessCode,

    #[error("A project with id '{0}' already exists, use edit")]
    AlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Form data for a project. Without an id, or with an id nothing is stored
/// under yet, a new project is created.
#[derive(Debug, Default, Clone)]
pub struct SaveProjectParameters {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub client_access_code: String,
    pub status: Status,
}

/// A new project always starts active. Editing keeps the stored archive
/// state and weekly updates.
pub fn save_project<S: Storage>(
    repository: &ProjectRepository<'_, S>,
    parameters: SaveProjectParameters,
) -> Result<Project, SaveProjectError> {
    if parameters.name.trim().is_empty() {
        return Err(SaveProjectError::MissingName);
    }
    if parameters.client_access_code.trim().is_empty() {
        return Err(SaveProjectError::MissingAccessCode);
    }

    let existing = match &parameters.id {
        Some(id) => match repository.get_by_id(id) {
            Ok(project) => Some(project),
            Err(ProjectError::NotFound(_)) => None,
            Err(ProjectError::Storage(e)) => return Err(e.into()),
        },
        None => None,
    };

    let thumbnail = parameters
        .thumbnail
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            existing
                .as_ref()
                .map(|p| p.thumbnail.clone())
                .filter(|t| !t.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_THUMBNAIL.to_string());

    let project = Project {
        id: parameters.id.unwrap_or_else(generate_id),
        name: parameters.name,
        location: parameters.location,
        description: parameters.description,
        thumbnail,
        client_access_code: parameters.client_access_code,
        status: parameters.status,
        is_archived: existing.as_ref().is_some_and(|p| p.is_archived),
        updates: existing.map(|p| p.updates).unwrap_or_default(),
    };

    repository.put(project.clone())?;
    info!(project = %project.id, name = %project.name, "Saved project");

    Ok(project)
}
