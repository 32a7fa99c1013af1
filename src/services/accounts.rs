use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    models::account::{Account, Identity, Role},
    secrets::{HashError, hash_secret, verify_secret},
    storage::{Database, Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("An account for '{0}' already exists")]
    Conflict(String),

    #[error("Email or phone is required")]
    InvalidIdentifier,

    #[error("Password must be at least {0} characters long")]
    WeakSecret(usize),

    #[error("Failed to hash secret: {0}")]
    Hash(HashError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum AuthenticateError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Client accounts plus the master-password check that grants admin.
pub struct CredentialStore<'a, S: Storage> {
    db: &'a Database<S>,
    auth: &'a AuthConfig,
}

impl<'a, S: Storage> CredentialStore<'a, S> {
    pub fn new(db: &'a Database<S>, auth: &'a AuthConfig) -> Self {
        Self { db, auth }
    }

    /// Creates a client account. Identifiers are compared exactly.
    pub fn register(&self, identifier: &str, secret: &str) -> Result<Account, RegisterError> {
        if identifier.trim().is_empty() {
            return Err(RegisterError::InvalidIdentifier);
        }
        if secret.chars().count() < self.auth.min_secret_length {
            return Err(RegisterError::WeakSecret(self.auth.min_secret_length));
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            identifier: identifier.to_string(),
            secret_hash: hash_secret(secret).map_err(RegisterError::Hash)?,
            role: Role::Client,
        };

        let created = self.db.update(|store| {
            if store.get_account_by_identifier(identifier).is_some() {
                return None;
            }
            store.accounts.push(account.clone());
            Some(())
        })?;

        match created {
            Some(()) => {
                info!(account = %account.id, "Registered client account");
                Ok(account)
            }
            None => Err(RegisterError::Conflict(identifier.to_string())),
        }
    }

    /// The master password grants admin whatever identifier it comes with;
    /// otherwise the identifier and secret must match a stored account.
    pub fn authenticate(&self, identifier: &str, secret: &str) -> Result<Identity, AuthenticateError> {
        if self.is_master_secret(secret) {
            info!("Admin authenticated with master password");
            return Ok(Identity::admin());
        }

        let store = self.db.snapshot()?;
        let account = store
            .get_account_by_identifier(identifier)
            .ok_or(AuthenticateError::Unauthorized)?;

        match verify_secret(secret, &account.secret_hash) {
            Ok(true) => {
                info!(account = %account.id, "Client authenticated");
                Ok(account.identity())
            }
            Ok(false) => Err(AuthenticateError::Unauthorized),
            Err(e) => {
                warn!(account = %account.id, error = %e, "Stored secret hash is unusable");
                Err(AuthenticateError::Unauthorized)
            }
        }
    }

    /// Admin-mode login: only the master password is accepted.
    pub fn authenticate_admin(&self, secret: &str) -> Result<Identity, AuthenticateError> {
        if self.is_master_secret(secret) {
            info!("Admin authenticated with master password");
            Ok(Identity::admin())
        } else {
            Err(AuthenticateError::Unauthorized)
        }
    }

    pub fn list_accounts(&self) -> Result<Vec<Identity>, StorageError> {
        let store = self.db.snapshot()?;
        Ok(store.accounts.iter().map(Account::identity).collect())
    }

    fn is_master_secret(&self, secret: &str) -> bool {
        let Some(hash) = self.auth.master_secret_hash.as_deref() else {
            return false;
        };
        verify_secret(secret, hash).unwrap_or_else(|e| {
            warn!(error = %e, "Configured master password hash is unusable");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    const MASTER: &str = "master-key-2024";

    fn auth_config() -> AuthConfig {
        AuthConfig {
            master_secret_hash: Some(hash_secret(MASTER).unwrap()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_register_then_authenticate_as_client() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);

        let account = credentials.register("a@b.com", "s3cret").unwrap();
        assert_eq!(account.role, Role::Client);
        assert_ne!(account.secret_hash, "s3cret");

        let identity = credentials.authenticate("a@b.com", "s3cret").unwrap();
        assert_eq!(identity, account.identity());
    }

    #[test]
    fn test_duplicate_registration_conflicts_without_write() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);
        credentials.register("a@b.com", "s3cret").unwrap();
        let before = db.snapshot().unwrap();

        let result = credentials.register("a@b.com", "other-secret");

        assert!(matches!(result, Err(RegisterError::Conflict(id)) if id == "a@b.com"));
        assert_eq!(db.snapshot().unwrap(), before);
    }

    #[test]
    fn test_identifier_match_is_case_sensitive() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);
        credentials.register("a@b.com", "s3cret").unwrap();

        assert!(credentials.register("A@B.com", "s3cret").is_ok());
        assert_eq!(credentials.list_accounts().unwrap().len(), 2);
    }

    #[test]
    fn test_register_rejects_short_secret_and_blank_identifier() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);

        assert!(matches!(
            credentials.register("a@b.com", "12345"),
            Err(RegisterError::WeakSecret(6))
        ));
        assert!(matches!(
            credentials.register("  ", "s3cret"),
            Err(RegisterError::InvalidIdentifier)
        ));
        assert!(credentials.list_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_wrong_secret_or_unknown_identifier_is_unauthorized() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);
        credentials.register("a@b.com", "s3cret").unwrap();

        assert!(matches!(
            credentials.authenticate("a@b.com", "wrong!"),
            Err(AuthenticateError::Unauthorized)
        ));
        assert!(matches!(
            credentials.authenticate("nobody@b.com", "s3cret"),
            Err(AuthenticateError::Unauthorized)
        ));
    }

    #[test]
    fn test_master_password_grants_admin_from_any_identifier() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);
        credentials.register("a@b.com", "s3cret").unwrap();

        for identifier in ["", "a@b.com", "someone-else"] {
            let identity = credentials.authenticate(identifier, MASTER).unwrap();
            assert_eq!(identity, Identity::admin());
        }
        assert_eq!(credentials.authenticate_admin(MASTER).unwrap(), Identity::admin());
        assert!(credentials.authenticate_admin("s3cret").is_err());
    }

    #[test]
    fn test_admin_is_never_persisted() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = auth_config();
        let credentials = CredentialStore::new(&db, &auth);

        credentials.authenticate("x", MASTER).unwrap();

        assert!(db.snapshot().unwrap().accounts.is_empty());
    }

    #[test]
    fn test_no_master_hash_means_no_admin() {
        let db = Database::open(MemoryStorage::new()).unwrap();
        let auth = AuthConfig::default();
        let credentials = CredentialStore::new(&db, &auth);

        assert!(credentials.authenticate_admin(MASTER).is_err());
        assert!(credentials.authenticate("admin", MASTER).is_err());
    }
}
