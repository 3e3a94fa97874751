use std::collections::BTreeSet;

use bson::Document;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;
use crate::error::{Error, Result};

/// Marker stored in `passwordHash` until an operator issues a real credential.
/// It is not a PHC string, so no password can ever verify against it.
pub const PLACEHOLDER_PASSWORD_HASH: &str = "!credential-not-issued";

pub const MAX_ROLLOUT_PERCENTAGE: u8 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub roles: BTreeSet<Role>,
    pub must_change_password: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// True while the account still carries the placeholder marker.
    #[must_use]
    pub fn credential_pending(&self) -> bool {
        self.password_hash == PLACEHOLDER_PASSWORD_HASH
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub name: String,
    pub globally_enabled: bool,
    pub rollout_percentage: u8,
    pub enabled_for_users: BTreeSet<String>,
    pub description: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl FeatureFlag {
    pub fn new(
        name: &str,
        description: &str,
        globally_enabled: bool,
        rollout_percentage: u8,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let flag = Self {
            name: name.to_string(),
            globally_enabled,
            rollout_percentage,
            enabled_for_users: BTreeSet::new(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        flag.validate()?;
        Ok(flag)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidDocument("feature flag name is empty".into()));
        }
        if self.rollout_percentage > MAX_ROLLOUT_PERCENTAGE {
            return Err(Error::InvalidDocument(format!(
                "feature flag '{}': rollout percentage {} exceeds {MAX_ROLLOUT_PERCENTAGE}",
                self.name, self.rollout_percentage
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub description: String,
    pub accuracy: f64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub active_from: DateTime<Utc>,
    /// Algorithm-specific settings; shape differs per model.
    pub parameters: Document,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ModelMetadata {
    pub fn new(
        model_name: &str,
        version: &str,
        description: &str,
        accuracy: f64,
        parameters: Document,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let entry = Self {
            model_name: model_name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            accuracy,
            active_from: now,
            parameters,
            created_at: now,
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.accuracy) {
            return Err(Error::InvalidDocument(format!(
                "model '{}' {}: accuracy {} outside [0, 1]",
                self.model_name, self.version, self.accuracy
            )));
        }
        Ok(())
    }
}
