use jiff::civil::Date;
use thiserror::Error;
use tracing::info;

use crate::{
    models::project::{MediaItem, WeeklyUpdate},
    services::{
        ids::generate_id,
        projects::{ProjectError, ProjectRepository},
    },
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Update '{0}' not found")]
    UpdateNotFound(String),

    #[error("Update description is required")]
    MissingDescription,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<ProjectError> for UpdateError {
    fn from(e: ProjectError) -> Self {
        match e {
            ProjectError::NotFound(id) => UpdateError::ProjectNotFound(id),
            ProjectError::Storage(e) => UpdateError::Storage(e),
        }
    }
}

pub struct AddUpdateParameters {
    pub project_id: String,
    /// Defaults to one past the number of existing updates
    pub week_number: Option<u32>,
    /// Defaults to today in the local time zone
    pub date: Option<Date>,
    pub description: String,
    pub media: Vec<MediaItem>,
}

/// Prepends a weekly update so the newest one comes first.
pub fn add_weekly_update<S: Storage>(
    repository: &ProjectRepository<'_, S>,
    parameters: AddUpdateParameters,
) -> Result<WeeklyUpdate, UpdateError> {
    if parameters.description.trim().is_empty() && parameters.media.is_empty() {
        return Err(UpdateError::MissingDescription);
    }

    let mut project = repository.get_by_id(&parameters.project_id)?;

    let week_number = parameters
        .week_number
        .unwrap_or_else(|| u32::try_from(project.updates.len() + 1).unwrap_or(u32::MAX));

    let update = WeeklyUpdate {
        id: generate_id(),
        week_number,
        date: parameters
            .date
            .unwrap_or_else(|| jiff::Zoned::now().date()),
        description: parameters.description,
        media: parameters.media,
    };

    project.updates.insert(0, update.clone());
    repository.put(project)?;

    info!(
        project = %parameters.project_id,
        week = update.week_number,
        media = update.media.len(),
        "Added weekly update"
    );
    Ok(update)
}

pub fn remove_weekly_update<S: Storage>(
    repository: &ProjectRepository<'_, S>,
    project_id: &str,
    update_id: &str,
) -> Result<WeeklyUpdate, UpdateError> {
    let mut project = repository.get_by_id(project_id)?;

    let position = project
        .updates
        .iter()
        .position(|u| u.id == update_id)
        .ok_or_else(|| UpdateError::UpdateNotFound(update_id.to_string()))?;
    let removed = project.updates.remove(position);

    repository.put(project)?;
    info!(project = %project_id, update = %update_id, "Removed weekly update");

    Ok(removed)
}

/// Appends media to an existing update.
pub fn attach_media<S: Storage>(
    repository: &ProjectRepository<'_, S>,
    project_id: &str,
    update_id: &str,
    item: MediaItem,
) -> Result<WeeklyUpdate, UpdateError> {
    let mut project = repository.get_by_id(project_id)?;

    let update = project
        .updates
        .iter_mut()
        .find(|u| u.id == update_id)
        .ok_or_else(|| UpdateError::UpdateNotFound(update_id.to_string()))?;
    update.media.push(item);
    let update = update.clone();

    repository.put(project)?;
    Ok(update)
}
