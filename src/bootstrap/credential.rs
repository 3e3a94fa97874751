use bson::doc;
use chrono::Utc;
use tracing::info;

use crate::auth::{CredentialHasher, check_password, generate_password};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::store::schema::USERS;

pub enum PasswordSource {
    /// Operator-chosen; clears `mustChangePassword`.
    Provided(String),
    /// Random, shown once; the account must still rotate it on first login.
    Generated,
}

#[derive(Debug)]
pub struct IssuedCredential {
    pub username: String,
    /// Present only for `PasswordSource::Generated`.
    pub generated_password: Option<String>,
    pub must_change_password: bool,
}

/// Replaces a user's password hash with an Argon2id hash of a real credential.
pub async fn set_password<S: Store>(
    store: &S,
    username: &str,
    source: PasswordSource,
) -> Result<IssuedCredential> {
    let (password, generated) = match source {
        PasswordSource::Provided(password) => (password, false),
        PasswordSource::Generated => (generate_password(), true),
    };
    check_password(&password)?;

    if store
        .find_one(USERS, doc! { "username": username })
        .await?
        .is_none()
    {
        return Err(Error::NotFound);
    }

    let password_hash = CredentialHasher::new().hash(&password)?;
    let must_change_password = generated;

    let matched = store
        .update_one(
            USERS,
            doc! { "username": username },
            doc! {
                "passwordHash": password_hash,
                "mustChangePassword": must_change_password,
                "updatedAt": bson::DateTime::from_chrono(Utc::now()),
            },
        )
        .await?;
    if !matched {
        return Err(Error::NotFound);
    }

    info!(username, must_change_password, "credential issued");

    Ok(IssuedCredential {
        username: username.to_string(),
        generated_password: generated.then_some(password),
        must_change_password,
    })
}
