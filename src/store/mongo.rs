use std::time::Duration;

use bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use super::{AppUserGrant, IndexSpec, Store};
use crate::error::{Error, Result};

const APP_NAME: &str = "bioseed";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

// Server error codes
const NAMESPACE_NOT_FOUND: i32 = 26;
const NAMESPACE_EXISTS: i32 = 48;
const INDEX_OPTIONS_CONFLICT: i32 = 85;
const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
const DUPLICATE_KEY: i32 = 11000;
const USER_ALREADY_EXISTS: i32 = 51003;

pub struct MongoStore {
    client: Client,
    db: Database,
    hosts: String,
}

impl MongoStore {
    /// Builds a client for `uri` targeting `database`. No round trip happens
    /// until the first operation; call `ping` to fail fast.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let options = client_options(uri).await?;

        let hosts = options
            .hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let client = Client::with_options(options)?;
        let db = client.database(database);

        Ok(Self { client, db, hosts })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

/// Parses `uri`, filling in only the settings it leaves unset.
async fn client_options(uri: &str) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| Error::Config(format!("invalid MongoDB URI: {e}")))?;
    options.app_name.get_or_insert_with(|| APP_NAME.to_string());
    options
        .server_selection_timeout
        .get_or_insert(SERVER_SELECTION_TIMEOUT);
    Ok(options)
}

/// Names an existing index answers to. A single-field ascending index also
/// answers to the default `<field>_1` name, whatever name it was built under.
fn index_names(index: &IndexModel) -> Vec<String> {
    let mut names: Vec<String> = index
        .options
        .as_ref()
        .and_then(|options| options.name.clone())
        .into_iter()
        .collect();

    let mut keys = index.keys.iter();
    if let (Some((field, direction)), None) = (keys.next(), keys.next()) {
        let ascending = match direction {
            Bson::Int32(d) => *d == 1,
            Bson::Int64(d) => *d == 1,
            Bson::Double(d) => *d == 1.0,
            _ => false,
        };
        let default = format!("{field}_1");
        if ascending && !names.contains(&default) {
            names.push(default);
        }
    }
    names
}

fn command_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(e) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        _ => None,
    }
}

/// Maps the server's "already there" codes onto `Error::AlreadyExists`.
fn map_exists(err: mongodb::error::Error, codes: &[i32]) -> Error {
    match command_code(&err) {
        Some(code) if codes.contains(&code) => Error::AlreadyExists,
        _ => Error::Mongo(err),
    }
}

impl Store for MongoStore {
    fn target(&self) -> String {
        format!("mongodb database '{}' on {}", self.db.name(), self.hosts)
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // App user operations

    async fn app_user_exists(&self, username: &str) -> Result<bool> {
        let reply = self
            .db
            .run_command(doc! {
                "usersInfo": { "user": username, "db": self.db.name() },
            })
            .await?;
        Ok(reply
            .get_array("users")
            .map(|users| !users.is_empty())
            .unwrap_or(false))
    }

    async fn create_app_user(&self, grant: &AppUserGrant) -> Result<()> {
        self.client
            .database(&grant.database)
            .run_command(doc! {
                "createUser": grant.username.as_str(),
                "pwd": grant.password.as_str(),
                "roles": [{ "role": grant.role.as_str(), "db": grant.database.as_str() }],
            })
            .await
            .map_err(|e| map_exists(e, &[USER_ALREADY_EXISTS]))?;
        Ok(())
    }

    // Collection operations

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = self.db.list_collection_names().await?;
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        self.db
            .create_collection(name)
            .await
            .map_err(|e| map_exists(e, &[NAMESPACE_EXISTS]))
    }

    // Index operations

    async fn list_indexes(&self, collection: &str) -> Result<Vec<String>> {
        let mut cursor = match self.collection(collection).list_indexes().await {
            Ok(cursor) => cursor,
            Err(e) if command_code(&e) == Some(NAMESPACE_NOT_FOUND) => return Ok(Vec::new()),
            Err(e) => return Err(Error::Mongo(e)),
        };

        let mut names = Vec::new();
        while cursor.advance().await? {
            names.extend(index_names(&cursor.deserialize_current()?));
        }
        Ok(names)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let name = spec.name();
        let mut keys = Document::new();
        keys.insert(spec.field, 1);

        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(spec.unique).name(name).build())
            .build();

        // the same key under another name or with other options conflicts
        self.collection(spec.collection)
            .create_index(model)
            .await
            .map_err(|e| map_exists(e, &[INDEX_OPTIONS_CONFLICT, INDEX_KEY_SPECS_CONFLICT]))?;
        Ok(())
    }

    // Document operations

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<()> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| map_exists(e, &[DUPLICATE_KEY]))?;
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: Document, set: Document) -> Result<bool> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .await
            .map_err(|e| map_exists(e, &[DUPLICATE_KEY]))?;
        Ok(result.matched_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNREACHABLE: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";

    fn index(keys: Document, name: Option<&str>) -> IndexModel {
        match name {
            Some(name) => IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build(),
            None => IndexModel::builder().keys(keys).build(),
        }
    }

    #[tokio::test]
    async fn test_uri_settings_take_precedence() {
        let options = client_options(UNREACHABLE).await.unwrap();
        assert_eq!(
            options.server_selection_timeout,
            Some(Duration::from_millis(200))
        );

        let defaulted = client_options("mongodb://localhost:27017").await.unwrap();
        assert_eq!(
            defaulted.server_selection_timeout,
            Some(SERVER_SELECTION_TIMEOUT)
        );
        assert_eq!(defaulted.app_name.as_deref(), Some(APP_NAME));
    }

    #[tokio::test]
    async fn test_ping_unreachable_server_is_connection_error() {
        let store = MongoStore::connect(UNREACHABLE, "fraud").await.unwrap();
        let result = store.ping().await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[test]
    fn test_index_under_custom_name_answers_to_default_name() {
        let names = index_names(&index(doc! { "email": 1 }, Some("email_unique")));
        assert_eq!(names, vec!["email_unique".to_string(), "email_1".to_string()]);

        let names = index_names(&index(doc! { "username": 1_i64 }, Some("username_1")));
        assert_eq!(names, vec!["username_1".to_string()]);
    }

    #[test]
    fn test_compound_and_descending_indexes_keep_their_names() {
        let compound = index(doc! { "email": 1, "username": 1 }, Some("email_1_username_1"));
        assert_eq!(index_names(&compound), vec!["email_1_username_1".to_string()]);

        let descending = index(doc! { "email": -1 }, Some("email_-1"));
        assert_eq!(index_names(&descending), vec!["email_-1".to_string()]);

        let text = index(doc! { "email": "text" }, None);
        assert!(index_names(&text).is_empty());
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_uri() {
        let result = MongoStore::connect("not-a-mongo-uri", "db").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_target_names_database_and_host() {
        let store = MongoStore::connect("mongodb://db.internal:27017", "fraud")
            .await
            .unwrap();
        let target = store.target();
        assert!(target.contains("'fraud'"));
        assert!(target.contains("db.internal:27017"));
    }
}
