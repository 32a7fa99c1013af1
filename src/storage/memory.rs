use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    models::store::{CURRENT_VERSION, Store},
    storage::{Storage, StorageError},
};

/// Keeps the store in process memory. Writes can be switched off to
/// exercise the failure paths of callers.
#[derive(Default)]
pub struct MemoryStorage {
    store: Mutex<Option<Store>>,
    reject_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn guard(&self) -> MutexGuard<'_, Option<Store>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(String::from(
                "memory store is read-only",
            )));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn stored_version(&self) -> Result<Option<u32>, StorageError> {
        Ok(self.guard().as_ref().map(|store| store.version))
    }

    fn load(&self) -> Result<Store, StorageError> {
        let guard = self.guard();
        match guard.as_ref() {
            Some(store) if store.version > CURRENT_VERSION => {
                Err(StorageError::FutureVersion(store.version))
            }
            Some(store) => Ok(store.clone()),
            None => Ok(Store::default()),
        }
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        self.check_writable()?;
        *self.guard() = Some(store.clone());
        Ok(())
    }

    fn update<T>(
        &self,
        apply: impl FnOnce(&mut Store) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        let mut guard = self.guard();
        let mut store = guard.as_ref().cloned().unwrap_or_default();
        store.version = CURRENT_VERSION;

        let outcome = apply(&mut store);
        if outcome.is_some() {
            self.check_writable()?;
            *guard = Some(store);
        }
        Ok(outcome)
    }
}
