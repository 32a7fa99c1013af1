use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{account::Account, project::Project};

/// Current schema version
pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub version: u32,
    /// Project records keyed by their id
    pub projects: BTreeMap<String, Project>,
    pub accounts: Vec<Account>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            projects: BTreeMap::new(),
            accounts: vec![],
        }
    }
}

impl Store {
    pub fn get_project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.get_mut(id)
    }

    pub fn get_account_by_identifier(&self, identifier: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.identifier == identifier)
    }
}
