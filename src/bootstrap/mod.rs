//! The ordered, idempotent provisioning sequence.
//!
//! Every item is checked for existence before it is created, and a store's
//! "already exists" answer is folded into [`Provisioned::Existing`], so
//! re-running against a provisioned database changes nothing.

mod credential;
mod report;
pub mod seed;
mod status;

use bson::doc;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub use credential::{IssuedCredential, PasswordSource, set_password};
pub use report::{BootstrapReport, Provisioned, Step, StepItem};
pub use status::{CollectionStatus, IndexStatus, SeedStatus, StatusReport, inspect};

use crate::config::BootstrapConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::store::schema::{COLLECTIONS, FEATURE_FLAGS, MODEL_METADATA, USERS, indexes_for};

pub struct Bootstrapper<'a, S: Store> {
    store: &'a S,
    config: &'a BootstrapConfig,
    now: DateTime<Utc>,
}

/// Folds a creation result into an outcome; a concurrent or earlier writer
/// winning the race counts as already provisioned.
fn settle(step: Step, name: &str, result: Result<()>) -> Result<Provisioned> {
    match result {
        Ok(()) => {
            info!(step = step.label(), item = name, "created");
            Ok(Provisioned::Created)
        }
        Err(Error::AlreadyExists) => {
            warn!(step = step.label(), item = name, "appeared after existence check, skipping");
            Ok(Provisioned::Existing)
        }
        Err(e) => Err(e),
    }
}

fn skip(step: Step, name: &str) -> Provisioned {
    debug!(step = step.label(), item = name, "already present");
    Provisioned::Existing
}

impl<'a, S: Store> Bootstrapper<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, config: &'a BootstrapConfig) -> Self {
        Self {
            store,
            config,
            now: Utc::now(),
        }
    }

    /// Pins the timestamp written into seed documents.
    #[must_use]
    pub fn with_timestamp(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub async fn run(&self) -> Result<BootstrapReport> {
        self.config.validate()?;
        self.store.ping().await?;

        let mut report = BootstrapReport::new(self.store.target());
        info!(store = %report.target, "bootstrapping");

        self.ensure_app_user(&mut report).await?;
        self.ensure_collections(&mut report).await?;
        self.ensure_indexes(&mut report).await?;
        self.seed_feature_flags(&mut report).await?;
        self.seed_admin(&mut report).await?;
        if report.admin_created() {
            info!(
                username = seed::ADMIN_USERNAME,
                "admin account created without a usable password; run `bioseed admin set-password`"
            );
        }
        self.seed_model_metadata(&mut report).await?;

        info!(created = report.created(), "bootstrap complete");
        Ok(report)
    }

    async fn ensure_app_user(&self, report: &mut BootstrapReport) -> Result<()> {
        let grant = self.config.app_user_grant();
        let step = Step::AppUser;

        let outcome = if self.store.app_user_exists(&grant.username).await? {
            skip(step, &grant.username)
        } else {
            settle(step, &grant.username, self.store.create_app_user(&grant).await)?
        };
        report.record(step, grant.username, outcome);
        Ok(())
    }

    async fn ensure_collections(&self, report: &mut BootstrapReport) -> Result<()> {
        let existing = self.store.list_collections().await?;
        let step = Step::Collection;

        for name in COLLECTIONS {
            let outcome = if existing.iter().any(|c| c == name) {
                skip(step, name)
            } else {
                settle(step, name, self.store.create_collection(name).await)?
            };
            report.record(step, name, outcome);
        }
        Ok(())
    }

    async fn ensure_indexes(&self, report: &mut BootstrapReport) -> Result<()> {
        let step = Step::Index;

        for collection in COLLECTIONS {
            let existing = self.store.list_indexes(collection).await?;

            for spec in indexes_for(collection) {
                let name = format!("{collection}.{}", spec.name());
                let outcome = if existing.contains(&spec.name()) {
                    skip(step, &name)
                } else {
                    settle(step, &name, self.store.create_index(spec).await)?
                };
                report.record(step, name, outcome);
            }
        }
        Ok(())
    }

    async fn seed_feature_flags(&self, report: &mut BootstrapReport) -> Result<()> {
        let step = Step::FeatureFlag;

        for flag in seed::feature_flags(self.now)? {
            let existing = self
                .store
                .find_one(FEATURE_FLAGS, doc! { "name": flag.name.as_str() })
                .await?;

            let outcome = if existing.is_some() {
                skip(step, &flag.name)
            } else {
                let document = bson::to_document(&flag)?;
                settle(
                    step,
                    &flag.name,
                    self.store.insert_one(FEATURE_FLAGS, document).await,
                )?
            };
            report.record(step, flag.name, outcome);
        }
        Ok(())
    }

    async fn seed_admin(&self, report: &mut BootstrapReport) -> Result<()> {
        let step = Step::AdminAccount;
        let admin = seed::admin_account(&self.config.admin_email, self.now);

        let existing = self
            .store
            .find_one(USERS, doc! { "username": admin.username.as_str() })
            .await?;

        let outcome = if existing.is_some() {
            skip(step, &admin.username)
        } else {
            // an account already holding the admin email also lands here
            let document = bson::to_document(&admin)?;
            settle(step, &admin.username, self.store.insert_one(USERS, document).await)?
        };
        report.record(step, admin.username, outcome);
        Ok(())
    }

    async fn seed_model_metadata(&self, report: &mut BootstrapReport) -> Result<()> {
        let step = Step::ModelMetadata;

        for model in seed::model_metadata(self.now)? {
            let name = format!("{}@{}", model.model_name, model.version);
            let existing = self
                .store
                .find_one(
                    MODEL_METADATA,
                    doc! {
                        "modelName": model.model_name.as_str(),
                        "version": model.version.as_str(),
                    },
                )
                .await?;

            let outcome = if existing.is_some() {
                skip(step, &name)
            } else {
                let document = bson::to_document(&model)?;
                settle(step, &name, self.store.insert_one(MODEL_METADATA, document).await)?
            };
            report.record(step, name, outcome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::config::{Backend, ConnectionConfig};
    use crate::store::SqliteStore;
    use crate::store::schema::{DEVICE_CONTEXTS, INDEXES};
    use crate::types::{FeatureFlag, ModelMetadata, Role, UserAccount};
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> BootstrapConfig {
        BootstrapConfig {
            connection: ConnectionConfig {
                backend: Backend::Sqlite {
                    path: temp.path().join("seed.db"),
                },
                database: "fraud".to_string(),
            },
            app_username: "app".to_string(),
            app_password: "app-password".to_string(),
            admin_email: "admin@example.com".to_string(),
        }
    }

    fn open(temp: &TempDir) -> SqliteStore {
        SqliteStore::new(temp.path().join("seed.db")).unwrap()
    }

    async fn snapshot(store: &SqliteStore) -> Vec<(String, Vec<String>, u64)> {
        let mut state = Vec::new();
        for collection in store.list_collections().await.unwrap() {
            let indexes = store.list_indexes(&collection).await.unwrap();
            let count = store.count_documents(&collection, doc! {}).await.unwrap();
            state.push((collection, indexes, count));
        }
        state
    }

    #[tokio::test]
    async fn test_fresh_run_creates_everything() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);

        let report = Bootstrapper::new(&store, &cfg).run().await.unwrap();

        assert_eq!(report.count(Step::AppUser, Provisioned::Created), 1);
        assert_eq!(report.count(Step::Collection, Provisioned::Created), 8);
        assert_eq!(report.count(Step::Index, Provisioned::Created), INDEXES.len());
        assert_eq!(report.count(Step::FeatureFlag, Provisioned::Created), 3);
        assert!(report.admin_created());
        assert_eq!(report.count(Step::ModelMetadata, Provisioned::Created), 2);

        let collections = store.list_collections().await.unwrap();
        for name in COLLECTIONS {
            assert!(collections.iter().any(|c| c == name), "missing {name}");
        }
        assert_eq!(
            store.count_documents(DEVICE_CONTEXTS, doc! {}).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);

        Bootstrapper::new(&store, &cfg).run().await.unwrap();
        let first = snapshot(&store).await;
        let first_admin = store
            .find_one(USERS, doc! { "username": "admin" })
            .await
            .unwrap();

        let report = Bootstrapper::new(&store, &cfg).run().await.unwrap();
        assert_eq!(report.created(), 0);
        assert!(!report.admin_created());

        assert_eq!(snapshot(&store).await, first);
        let second_admin = store
            .find_one(USERS, doc! { "username": "admin" })
            .await
            .unwrap();
        assert_eq!(first_admin, second_admin);
    }

    #[tokio::test]
    async fn test_unique_keys_enforced_after_bootstrap() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);
        Bootstrapper::new(&store, &cfg).run().await.unwrap();

        let same_username = store
            .insert_one(USERS, doc! { "username": "admin", "email": "other@example.com" })
            .await;
        assert!(matches!(same_username, Err(Error::AlreadyExists)));

        let same_email = store
            .insert_one(USERS, doc! { "username": "other", "email": "admin@example.com" })
            .await;
        assert!(matches!(same_email, Err(Error::AlreadyExists)));

        let same_flag = store
            .insert_one(FEATURE_FLAGS, doc! { "name": "deepfake_detection_v2" })
            .await;
        assert!(matches!(same_flag, Err(Error::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_seeded_admin_shape() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);
        Bootstrapper::new(&store, &cfg).run().await.unwrap();

        let document = store
            .find_one(USERS, doc! { "username": "admin" })
            .await
            .unwrap()
            .unwrap();
        let admin: UserAccount = bson::from_document(document).unwrap();

        assert!(admin.must_change_password);
        assert_eq!(admin.roles, BTreeSet::from([Role::Admin]));
        assert_eq!(admin.email, "admin@example.com");
        assert!(admin.credential_pending());
    }

    #[tokio::test]
    async fn test_seeded_flags() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);
        Bootstrapper::new(&store, &cfg).run().await.unwrap();

        let document = store
            .find_one(FEATURE_FLAGS, doc! { "name": "deepfake_detection_v2" })
            .await
            .unwrap()
            .unwrap();
        let flag: FeatureFlag = bson::from_document(document).unwrap();
        assert!(!flag.globally_enabled);
        assert_eq!(flag.rollout_percentage, 0);

        let document = store
            .find_one(FEATURE_FLAGS, doc! { "name": "adaptive_device_processing" })
            .await
            .unwrap()
            .unwrap();
        let flag: FeatureFlag = bson::from_document(document).unwrap();
        assert!(flag.globally_enabled);
        assert_eq!(flag.rollout_percentage, 100);

        assert_eq!(
            store
                .count_documents(FEATURE_FLAGS, doc! { "globallyEnabled": false })
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_seeded_model_metadata() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);
        Bootstrapper::new(&store, &cfg).run().await.unwrap();

        let document = store
            .find_one(MODEL_METADATA, doc! { "modelName": "deepfake_detector" })
            .await
            .unwrap()
            .unwrap();
        let model: ModelMetadata = bson::from_document(document).unwrap();

        assert_eq!(model.version, "1.0.0");
        assert_eq!(model.accuracy, 0.92);
        assert_eq!(model.parameters.get_i32("temporalWindowSize").unwrap(), 16);
    }

    #[tokio::test]
    async fn test_partial_prior_state_is_completed() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);

        store.create_collection(USERS).await.unwrap();
        store
            .insert_one(FEATURE_FLAGS, doc! { "name": "enhanced_face_detection" })
            .await
            .unwrap();

        let report = Bootstrapper::new(&store, &cfg).run().await.unwrap();

        assert_eq!(report.count(Step::Collection, Provisioned::Existing), 2);
        assert_eq!(report.count(Step::Collection, Provisioned::Created), 6);
        assert_eq!(report.count(Step::FeatureFlag, Provisioned::Existing), 1);
        assert_eq!(report.count(Step::FeatureFlag, Provisioned::Created), 2);
        assert_eq!(
            store.count_documents(FEATURE_FLAGS, doc! {}).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_admin_email_collision_is_treated_as_provisioned() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let cfg = config(&temp);

        for spec in indexes_for(USERS) {
            store.create_index(spec).await.unwrap();
        }
        store
            .insert_one(USERS, doc! { "username": "root", "email": "admin@example.com" })
            .await
            .unwrap();

        let report = Bootstrapper::new(&store, &cfg).run().await.unwrap();
        assert_eq!(report.count(Step::AdminAccount, Provisioned::Existing), 1);
        assert_eq!(store.count_documents(USERS, doc! {}).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_any_write() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let mut cfg = config(&temp);
        cfg.app_password = String::new();

        let result = Bootstrapper::new(&store, &cfg).run().await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut cfg = config(&temp);
        cfg.connection.backend = Backend::Mongo {
            uri: "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200".to_string(),
        };

        let store = crate::store::open(&cfg.connection).await.unwrap();
        let result = Bootstrapper::new(&store, &cfg).run().await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
