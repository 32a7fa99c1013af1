use thiserror::Error;

use crate::models::{account::Identity, project::Project};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Invalid access code")]
    InvalidAccessCode,

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Only an administrator can do this")]
    AdminRequired,
}

/// What a dashboard asks for. `show_archived` only means something to admins.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectFilter<'a> {
    pub show_archived: bool,
    pub search: Option<&'a str>,
}

impl ProjectFilter<'_> {
    fn matches_search(&self, project: &Project) -> bool {
        let Some(term) = self.search.map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        project.name.to_lowercase().contains(&term)
            || project.location.to_lowercase().contains(&term)
    }
}

/// Admins see either the active or the archived projects; clients only
/// ever see active ones.
pub fn is_visible(identity: &Identity, project: &Project, show_archived: bool) -> bool {
    if identity.is_admin() {
        project.is_archived == show_archived
    } else {
        !project.is_archived
    }
}

pub fn visible_projects<'p>(
    projects: &'p [Project],
    identity: &Identity,
    filter: &ProjectFilter<'_>,
) -> Vec<&'p Project> {
    projects
        .iter()
        .filter(|p| is_visible(identity, p, filter.show_archived))
        .filter(|p| filter.matches_search(p))
        .collect()
}

/// Detail view gate. Admins skip the code check; clients must present the
/// project's access code and can never open an archived project.
pub fn authorize_detail<'p>(
    identity: &Identity,
    project: &'p Project,
    code: Option<&str>,
) -> Result<&'p Project, AccessError> {
    if identity.is_admin() {
        return Ok(project);
    }
    if project.is_archived {
        return Err(AccessError::ProjectNotFound(project.id.clone()));
    }
    match code {
        Some(code) if code == project.client_access_code => Ok(project),
        _ => Err(AccessError::InvalidAccessCode),
    }
}

pub fn require_admin(identity: &Identity) -> Result<(), AccessError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AccessError::AdminRequired)
    }
}
