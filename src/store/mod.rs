mod mongo;
pub mod schema;
mod sqlite;

use std::future::Future;

use bson::Document;

pub use mongo::MongoStore;
pub use schema::IndexSpec;
pub use sqlite::SqliteStore;

use crate::config::{Backend, ConnectionConfig};
use crate::error::Result;

/// Credentials and scope for the application-level database user.
#[derive(Debug, Clone)]
pub struct AppUserGrant {
    pub username: String,
    pub password: String,
    pub database: String,
    pub role: String,
}

/// Store defines the administrative operations the bootstrap issues.
///
/// Callers check for existence first. Creation methods return
/// `Error::AlreadyExists` when the store reports the target as present or
/// conflicting, so a lost race is treated the same as a prior run.
pub trait Store: Send + Sync {
    /// Human-readable description of the target, for logs.
    fn target(&self) -> String;

    /// Round-trips to the database; fails with `Error::Connection` when unreachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // App user operations
    fn app_user_exists(&self, username: &str) -> impl Future<Output = Result<bool>> + Send;
    fn create_app_user(&self, grant: &AppUserGrant) -> impl Future<Output = Result<()>> + Send;

    // Collection operations
    fn list_collections(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
    fn create_collection(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    // Index operations
    /// Index names on `collection`. An equivalent single-field ascending
    /// index is also listed under its default `<field>_1` name.
    fn list_indexes(&self, collection: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
    fn create_index(&self, spec: &IndexSpec) -> impl Future<Output = Result<()>> + Send;

    // Document operations. Filters are flat field equality.
    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = Result<Option<Document>>> + Send;
    fn count_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = Result<u64>> + Send;
    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = Result<()>> + Send;
    /// Applies `$set` semantics to the first match. Returns whether a document matched.
    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Runtime choice of backend. `Store` is not object safe, so dispatch is by enum.
pub enum AnyStore {
    Mongo(MongoStore),
    Sqlite(SqliteStore),
}

/// Opens the store named by `config`. Does not ping.
pub async fn open(config: &ConnectionConfig) -> Result<AnyStore> {
    match &config.backend {
        Backend::Mongo { uri } => Ok(AnyStore::Mongo(
            MongoStore::connect(uri, &config.database).await?,
        )),
        Backend::Sqlite { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(AnyStore::Sqlite(SqliteStore::new(path)?))
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyStore::Mongo($store) => $call,
            AnyStore::Sqlite($store) => $call,
        }
    };
}

impl Store for AnyStore {
    fn target(&self) -> String {
        dispatch!(self, s => s.target())
    }

    async fn ping(&self) -> Result<()> {
        dispatch!(self, s => s.ping().await)
    }

    async fn app_user_exists(&self, username: &str) -> Result<bool> {
        dispatch!(self, s => s.app_user_exists(username).await)
    }

    async fn create_app_user(&self, grant: &AppUserGrant) -> Result<()> {
        dispatch!(self, s => s.create_app_user(grant).await)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        dispatch!(self, s => s.list_collections().await)
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        dispatch!(self, s => s.create_collection(name).await)
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<String>> {
        dispatch!(self, s => s.list_indexes(collection).await)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        dispatch!(self, s => s.create_index(spec).await)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        dispatch!(self, s => s.find_one(collection, filter).await)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        dispatch!(self, s => s.count_documents(collection, filter).await)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<()> {
        dispatch!(self, s => s.insert_one(collection, document).await)
    }

    async fn update_one(&self, collection: &str, filter: Document, set: Document) -> Result<bool> {
        dispatch!(self, s => s.update_one(collection, filter, set).await)
    }
}
