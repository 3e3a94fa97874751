use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::store::AppUserGrant;
use crate::store::schema::APP_USER_ROLE;

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@localhost";

// MongoDB rejects these in database names
const FORBIDDEN_DB_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];
const MAX_DB_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Mongo { uri: String },
    /// Local document store, for development and tests.
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub backend: Backend,
    pub database: String,
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<()> {
        let name = &self.database;
        if name.is_empty() {
            return Err(Error::Config("database name is empty".into()));
        }
        if name.len() > MAX_DB_NAME_LEN {
            return Err(Error::Config(format!(
                "database name '{name}' exceeds {MAX_DB_NAME_LEN} bytes"
            )));
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_DB_CHARS.contains(c)) {
            return Err(Error::Config(format!(
                "database name '{name}' contains forbidden character {c:?}"
            )));
        }
        if let Backend::Mongo { uri } = &self.backend {
            if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                return Err(Error::Config(format!(
                    "MongoDB URI must start with mongodb:// or mongodb+srv://, got '{uri}'"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub connection: ConnectionConfig,
    pub app_username: String,
    pub app_password: String,
    pub admin_email: String,
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;

        if self.app_username.trim().is_empty() {
            return Err(Error::Config("application username is empty".into()));
        }
        if self.app_password.is_empty() {
            return Err(Error::Config("application password is empty".into()));
        }

        let email = &self.admin_email;
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid_email {
            return Err(Error::Config(format!("invalid admin email '{email}'")));
        }
        Ok(())
    }

    /// The application login: `readWrite` on the target database only.
    #[must_use]
    pub fn app_user_grant(&self) -> AppUserGrant {
        AppUserGrant {
            username: self.app_username.clone(),
            password: self.app_password.clone(),
            database: self.connection.database.clone(),
            role: APP_USER_ROLE.to_string(),
        }
    }
}
