use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::store::{CURRENT_VERSION, Store};

pub mod json;
pub mod memory;
pub mod migrations;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load store from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save store to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock store at '{path}': {source}")]
    LockFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize store to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store has a malformed version field: {0}")]
    InvalidVersion(String),

    #[error(
        "Store file was created by a newer version of ndertimi (version {0}). Please upgrade ndertimi to open this file."
    )]
    FutureVersion(u32),

    #[error("Store file has unsupported version {0}. This version of ndertimi cannot read this file.")]
    UnsupportedVersion(u32),

    #[error("Failed to migrate store from version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("Store rejected the write: {0}")]
    WriteRejected(String),
}

pub trait Storage {
    /// Version of the stored document, `None` when nothing has been stored yet.
    fn stored_version(&self) -> Result<Option<u32>, StorageError>;

    /// Loads the document in the current schema. An empty store is returned
    /// when nothing has been stored yet.
    fn load(&self) -> Result<Store, StorageError>;

    fn save(&self, store: &Store) -> Result<(), StorageError>;

    /// Runs `apply` against the latest document under the writer lock and
    /// persists the result. Returning `None` from `apply` leaves the stored
    /// document untouched.
    fn update<T>(
        &self,
        apply: impl FnOnce(&mut Store) -> Option<T>,
    ) -> Result<Option<T>, StorageError>;
}

/// Open handle over a [`Storage`]. Components borrow it for as long as they
/// need to read or write; dropping or closing it ends the session.
pub struct Database<S: Storage> {
    storage: S,
}

impl<S: Storage> Database<S> {
    /// Validates the stored document, creating it when absent and persisting
    /// the migrated form when it was written by an older schema.
    pub fn open(storage: S) -> Result<Self, StorageError> {
        match storage.stored_version()? {
            None => {
                storage.save(&Store::default())?;
                info!(version = CURRENT_VERSION, "Created empty store");
            }
            Some(version) if version > CURRENT_VERSION => {
                return Err(StorageError::FutureVersion(version));
            }
            Some(version) if version < CURRENT_VERSION => {
                info!(from = version, to = CURRENT_VERSION, "Migrating store");
                storage.update(|_| Some(()))?;
            }
            Some(_) => {
                let store = storage.load()?;
                debug!(
                    projects = store.projects.len(),
                    accounts = store.accounts.len(),
                    "Opened store"
                );
            }
        }

        Ok(Self { storage })
    }

    /// Reads the whole document as it is right now.
    pub fn snapshot(&self) -> Result<Store, StorageError> {
        self.storage.load()
    }

    pub fn update<T>(
        &self,
        apply: impl FnOnce(&mut Store) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        self.storage.update(apply)
    }

    /// Ends the session and hands the storage back.
    pub fn close(self) -> S {
        debug!("Closed store");
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{json::JsonFileStorage, memory::MemoryStorage};

    #[test]
    fn test_open_creates_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let db = Database::open(JsonFileStorage::new(path.clone())).unwrap();

        assert!(path.exists(), "open should create the store file");
        assert_eq!(db.snapshot().unwrap(), Store::default());
    }

    #[test]
    fn test_open_rejects_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"version": 999, "projects": {}, "accounts": []}"#).unwrap();

        match Database::open(JsonFileStorage::new(path)) {
            Err(StorageError::FutureVersion(999)) => {}
            _ => panic!("Expected FutureVersion(999) error"),
        }
    }

    #[test]
    fn test_open_persists_migrated_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"projects": [], "users": []}"#).unwrap();

        let storage = Database::open(JsonFileStorage::new(path.clone()))
            .unwrap()
            .close();

        assert_eq!(storage.stored_version().unwrap(), Some(CURRENT_VERSION));
    }

    #[test]
    fn test_close_hands_back_storage_for_reopen() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        db.update(|store| {
            store.accounts.clear();
            Some(())
        })
        .unwrap();

        let reopened = Database::open(db.close()).unwrap();
        assert_eq!(reopened.snapshot().unwrap().version, CURRENT_VERSION);
    }
}
