use std::{
    fs::{self, File, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::{Value, to_string_pretty};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    models::store::{CURRENT_VERSION, Store},
    storage::{
        Storage, StorageError,
        migrations::{apply_migrations, detect_version},
    },
};

/// Number of previous store files kept in the backups directory
pub const DEFAULT_BACKUP_LIMIT: usize = 5;

pub struct JsonFileStorage {
    path: PathBuf,
    backup_limit: usize,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            backup_limit: DEFAULT_BACKUP_LIMIT,
        }
    }

    pub fn with_backup_limit(mut self, backup_limit: usize) -> Self {
        self.backup_limit = backup_limit;
        self
    }

    fn read_document(&self) -> Result<Option<Value>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| StorageError::ParseFailed {
                    path: self.path.clone(),
                    source: e,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn lock(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::SaveFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::LockFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::LockFailed {
                path: lock_file_path,
                source: e,
            })?;

        Ok(lock_file)
    }

    fn unlock(&self, lock_file: File) -> Result<(), StorageError> {
        lock_file.unlock().map_err(|e| StorageError::LockFailed {
            path: self.path.with_extension("lock"),
            source: e,
        })
    }

    /// Caller must hold the lock.
    fn write_locked(&self, store: &Store) -> Result<(), StorageError> {
        let json =
            to_string_pretty(store).map_err(|e| StorageError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let result = self
            .create_backup()
            .and_then(|_| self.cleanup_old_backups())
            .and_then(|_| {
                rename(&temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
                    path: self.path.clone(),
                    source: e,
                })
            });

        match &result {
            Ok(()) => debug!(
                path = %self.path.display(),
                projects = store.projects.len(),
                "Saved store"
            ),
            Err(_) => {
                let _ = fs::remove_file(&temp_path);
            }
        }
        result
    }

    fn create_backup(&self) -> Result<u64, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists || self.backup_limit == 0 {
            return Ok(0);
        }

        let backups_dir = self.get_backup_dir();
        fs::create_dir_all(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;

        let backup_path = self.get_backup_path();
        fs::copy(&self.path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path,
            source: e,
        })
    }

    fn cleanup_old_backups(&self) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = file_entries.len().saturating_sub(self.backup_limit);
        for file_path in &file_entries[..number_of_files_to_delete] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        let parent_store_path = self.path.parent().unwrap_or(Path::new("."));
        parent_store_path.join("backups")
    }

    fn get_backup_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("store"));

        // Zero-padded so that lexical order is chronological
        let nanos = jiff::Timestamp::now().as_nanosecond();
        self.get_backup_dir()
            .join(format!("{}-{:020}", file_name, nanos))
    }
}

impl Storage for JsonFileStorage {
    fn stored_version(&self) -> Result<Option<u32>, StorageError> {
        match self.read_document()? {
            Some(data) => detect_version(&data).map(Some),
            None => Ok(None),
        }
    }

    fn load(&self) -> Result<Store, StorageError> {
        let Some(mut data) = self.read_document()? else {
            return Ok(Store::default());
        };

        let file_version = detect_version(&data)?;
        if file_version > CURRENT_VERSION {
            return Err(StorageError::FutureVersion(file_version));
        }

        if file_version < CURRENT_VERSION {
            data = apply_migrations(data, file_version, CURRENT_VERSION)?;
        }

        if let Some(obj) = data.as_object_mut() {
            obj.insert("version".to_string(), serde_json::json!(CURRENT_VERSION));
        }

        serde_json::from_value(data).map_err(|e| StorageError::ParseFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        let lock_file = self.lock()?;
        self.write_locked(store)?;
        self.unlock(lock_file)
    }

    fn update<T>(
        &self,
        apply: impl FnOnce(&mut Store) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        let lock_file = self.lock()?;

        let mut store = self.load()?;
        let outcome = apply(&mut store);
        match outcome {
            Some(_) => self.write_locked(&store)?,
            None => debug!(path = %self.path.display(), "Nothing to write"),
        }

        if let Err(e) = self.unlock(lock_file) {
            warn!(error = %e, "Failed to release store lock");
        }

        Ok(outcome)
    }
}
