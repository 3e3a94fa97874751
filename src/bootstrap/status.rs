use bson::doc;
use chrono::Utc;
use serde::Serialize;

use super::seed;
use crate::error::Result;
use crate::store::Store;
use crate::store::schema::{COLLECTIONS, FEATURE_FLAGS, MODEL_METADATA, USERS, indexes_for};
use crate::types::UserAccount;

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub name: String,
    pub unique: bool,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub name: String,
    pub exists: bool,
    pub indexes: Vec<IndexStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedStatus {
    pub collection: String,
    pub key: String,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub target: String,
    pub collections: Vec<CollectionStatus>,
    pub seeds: Vec<SeedStatus>,
    /// `None` when the admin account is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_credential_pending: Option<bool>,
}

impl StatusReport {
    /// True when every declared collection, index and seed document exists.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.collections
            .iter()
            .all(|c| c.exists && c.indexes.iter().all(|i| i.present))
            && self.seeds.iter().all(|s| s.present)
    }
}

/// Reads back what a bootstrap would provision, without writing anything.
pub async fn inspect<S: Store>(store: &S) -> Result<StatusReport> {
    store.ping().await?;

    let existing = store.list_collections().await?;
    let mut collections = Vec::with_capacity(COLLECTIONS.len());

    for name in COLLECTIONS {
        let present = store.list_indexes(name).await?;
        let indexes = indexes_for(name)
            .map(|spec| IndexStatus {
                present: present.contains(&spec.name()),
                name: spec.name(),
                unique: spec.unique,
            })
            .collect();

        collections.push(CollectionStatus {
            name: name.to_string(),
            exists: existing.iter().any(|c| c == name),
            indexes,
        });
    }

    let now = Utc::now();
    let mut seeds = Vec::new();

    for flag in seed::feature_flags(now)? {
        let present = store
            .find_one(FEATURE_FLAGS, doc! { "name": flag.name.as_str() })
            .await?
            .is_some();
        seeds.push(SeedStatus {
            collection: FEATURE_FLAGS.to_string(),
            key: flag.name,
            present,
        });
    }

    let admin = store
        .find_one(USERS, doc! { "username": seed::ADMIN_USERNAME })
        .await?
        .map(bson::from_document::<UserAccount>)
        .transpose()?;
    seeds.push(SeedStatus {
        collection: USERS.to_string(),
        key: seed::ADMIN_USERNAME.to_string(),
        present: admin.is_some(),
    });
    let admin_credential_pending = admin.as_ref().map(UserAccount::credential_pending);

    for model in seed::model_metadata(now)? {
        let present = store
            .find_one(
                MODEL_METADATA,
                doc! {
                    "modelName": model.model_name.as_str(),
                    "version": model.version.as_str(),
                },
            )
            .await?
            .is_some();
        seeds.push(SeedStatus {
            collection: MODEL_METADATA.to_string(),
            key: format!("{}@{}", model.model_name, model.version),
            present,
        });
    }

    Ok(StatusReport {
        target: store.target(),
        collections,
        seeds,
        admin_credential_pending,
    })
}
