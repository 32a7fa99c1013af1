use std::fmt;

use serde::{Deserialize, Serialize};

/// Id and identifier of the identity synthesized for the master password
pub const ADMIN_ID: &str = "admin";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// UUID of the account
    pub id: String,
    /// Email or phone number, unique across accounts
    pub identifier: String,
    /// Argon2id PHC string of the account secret
    pub secret_hash: String,
    pub role: Role,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            role: self.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Client => f.write_str("client"),
        }
    }
}

/// Who is using the system. Holds no secret and has no expiry; the caller
/// keeps it for as long as the session lasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub identifier: String,
    pub role: Role,
}

impl Identity {
    pub fn admin() -> Self {
        Self {
            id: String::from(ADMIN_ID),
            identifier: String::from(ADMIN_ID),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
