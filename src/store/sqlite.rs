use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bson::{Bson, Document};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use super::{AppUserGrant, IndexSpec, Store};
use crate::auth::CredentialHasher;
use crate::error::{Error, Result};

/// Internal bookkeeping tables share this prefix and are hidden from
/// `list_collections`.
const INTERNAL_PREFIX: &str = "_bioseed_";

/// Stands in for missing and null fields inside index expressions.
const MISSING_FIELD: &str = "x'00'";

const APP_USERS_SCHEMA: &str = r#"
-- Application users: the SQLite analogue of a database-scoped login
CREATE TABLE IF NOT EXISTS _bioseed_app_users (
    username TEXT PRIMARY KEY,
    database TEXT NOT NULL,
    role TEXT NOT NULL,
    password_hash TEXT NOT NULL,   -- argon2id hash with embedded salt
    created_at TEXT DEFAULT (datetime('now'))
);
"#;

/// A file-backed document store. Each collection is a table of extended-JSON
/// bodies; indexes are expression indexes over `json_extract`.
///
/// Bodies are stored as relaxed extended JSON, so numeric width is not
/// preserved: an `Int64` that fits in 32 bits reads back as `Int32`. Callers
/// that care about exact BSON types should deserialize into typed models.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(APP_USERS_SCHEMA)?;

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn index_name(spec: &IndexSpec) -> String {
    format!("{}.{}", spec.collection, spec.name())
}

/// Field names end up inside SQL string literals in index expressions, so
/// only plain identifiers are accepted.
fn json_path(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::InvalidDocument(format!(
            "unsupported field name '{field}'"
        )));
    }
    Ok(format!("$.{field}"))
}

/// The indexed and filtered expression for a field. A missing field and an
/// explicit null both collapse to the same blob, which JSON values never
/// produce, so a unique index admits at most one document without the field.
fn field_expr(path: &str) -> String {
    format!("IFNULL(json_extract(body, '{path}'), {MISSING_FIELD})")
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn create_table(conn: &Connection, name: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        );",
        quote_ident(name)
    ))?;
    Ok(())
}

fn encode_body(document: Document) -> Result<String> {
    let value = Bson::Document(document).into_relaxed_extjson();
    Ok(serde_json::to_string(&value)?)
}

fn decode_body(body: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    match Bson::try_from(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(other) => Err(Error::InvalidDocument(format!(
            "stored body is not a document: {other}"
        ))),
        Err(e) => Err(Error::InvalidDocument(format!(
            "stored body is not extended json: {e}"
        ))),
    }
}

fn filter_value(field: &str, value: &Bson) -> Result<Value> {
    match value {
        Bson::String(s) => Ok(Value::Text(s.clone())),
        Bson::Int32(i) => Ok(Value::Integer(i64::from(*i))),
        Bson::Int64(i) => Ok(Value::Integer(*i)),
        Bson::Double(d) => Ok(Value::Real(*d)),
        // json_extract yields 1/0 for JSON booleans
        Bson::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
        Bson::Null => Ok(Value::Blob(vec![0])),
        other => Err(Error::InvalidDocument(format!(
            "unsupported filter value for '{field}': {other}"
        ))),
    }
}

/// Builds `WHERE <field_expr> = ?1 AND ...` for a flat equality filter.
/// Expressions are inlined so the planner can match expression indexes.
fn where_clause(filter: &Document) -> Result<(String, Vec<Value>)> {
    let mut clauses = Vec::with_capacity(filter.len());
    let mut values = Vec::with_capacity(filter.len());

    for (field, value) in filter {
        let path = json_path(field)?;
        values.push(filter_value(field, value)?);
        clauses.push(format!("{} = ?{}", field_expr(&path), values.len()));
    }

    if clauses.is_empty() {
        Ok((String::new(), values))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
    }
}

impl Store for SqliteStore {
    fn target(&self) -> String {
        format!("sqlite database {}", self.path.display())
    }

    async fn ping(&self) -> Result<()> {
        self.conn()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // App user operations

    async fn app_user_exists(&self, username: &str) -> Result<bool> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT 1 FROM _bioseed_app_users WHERE username = ?1",
                params![username],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn create_app_user(&self, grant: &AppUserGrant) -> Result<()> {
        let password_hash = CredentialHasher::new().hash(&grant.password)?;

        let result = self.conn().execute(
            "INSERT INTO _bioseed_app_users (username, database, role, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                grant.username,
                grant.database,
                grant.role,
                password_hash,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    // Collection operations

    async fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let names = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(names
            .into_iter()
            .filter(|name| !name.starts_with(INTERNAL_PREFIX))
            .collect())
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.starts_with(INTERNAL_PREFIX) || name.starts_with("sqlite_") {
            return Err(Error::InvalidDocument(format!(
                "invalid collection name '{name}'"
            )));
        }

        let conn = self.conn();
        if table_exists(&conn, name)? {
            return Err(Error::AlreadyExists);
        }
        create_table(&conn, name)
    }

    // Index operations

    async fn list_indexes(&self, collection: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
        let names = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        let prefix = format!("{collection}.");
        Ok(names
            .into_iter()
            .filter_map(|name| name.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let path = json_path(spec.field)?;
        let name = index_name(spec);

        let conn = self.conn();
        // MongoDB creates the collection implicitly on first index build
        create_table(&conn, spec.collection)?;

        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::AlreadyExists);
        }

        let unique = if spec.unique { "UNIQUE " } else { "" };
        conn.execute_batch(&format!(
            "CREATE {unique}INDEX {} ON {}({});",
            quote_ident(&name),
            quote_ident(spec.collection),
            field_expr(&path),
        ))?;
        Ok(())
    }

    // Document operations

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        let (clause, values) = where_clause(&filter)?;

        let conn = self.conn();
        if !table_exists(&conn, collection)? {
            return Ok(None);
        }
        let body: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT body FROM {}{clause} ORDER BY rowid LIMIT 1",
                    quote_ident(collection)
                ),
                params_from_iter(values),
                |row| row.get(0),
            )
            .optional()?;

        body.as_deref().map(decode_body).transpose()
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        let (clause, values) = where_clause(&filter)?;

        let conn = self.conn();
        if !table_exists(&conn, collection)? {
            return Ok(0);
        }
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{clause}", quote_ident(collection)),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<()> {
        let body = encode_body(document)?;

        let conn = self.conn();
        create_table(&conn, collection)?;

        let result = conn.execute(
            &format!(
                "INSERT INTO {} (id, body, created_at) VALUES (?1, ?2, ?3)",
                quote_ident(collection)
            ),
            params![Uuid::new_v4().to_string(), body, Utc::now().to_rfc3339()],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    async fn update_one(&self, collection: &str, filter: Document, set: Document) -> Result<bool> {
        let (clause, values) = where_clause(&filter)?;

        let conn = self.conn();
        if !table_exists(&conn, collection)? {
            return Ok(false);
        }
        let row: Option<(String, String)> = conn
            .query_row(
                &format!(
                    "SELECT id, body FROM {}{clause} ORDER BY rowid LIMIT 1",
                    quote_ident(collection)
                ),
                params_from_iter(values),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((id, body)) = row else {
            return Ok(false);
        };

        let mut document = decode_body(&body)?;
        for (field, value) in set {
            document.insert(field, value);
        }

        let result = conn.execute(
            &format!("UPDATE {} SET body = ?1 WHERE id = ?2", quote_ident(collection)),
            params![encode_body(document)?, id],
        );

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }
}
