use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::{Backend, ConnectionConfig, DEFAULT_ADMIN_EMAIL, DEFAULT_MONGO_URI};

/// Where to connect. Every flag falls back to its environment variable.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// MongoDB connection string
    #[arg(long, env = "MONGO_URI", default_value = DEFAULT_MONGO_URI)]
    pub uri: String,

    /// Target database name
    #[arg(long, env = "MONGO_DATABASE")]
    pub database: String,

    /// Use a local SQLite document store at this path instead of MongoDB
    #[arg(long, env = "BIOSEED_SQLITE_PATH")]
    pub sqlite: Option<PathBuf>,
}

impl ConnectionArgs {
    #[must_use]
    pub fn into_config(self) -> ConnectionConfig {
        let backend = match self.sqlite {
            Some(path) => Backend::Sqlite { path },
            None => Backend::Mongo { uri: self.uri },
        };
        ConnectionConfig {
            backend,
            database: self.database,
        }
    }
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Issue the real credential for an account seeded with a placeholder
    SetPassword {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Account to update
        #[arg(long, default_value = "admin")]
        username: String,

        /// Read the new password from the first line of stdin
        #[arg(long, conflicts_with = "generate")]
        password_stdin: bool,

        /// Generate a random password, print it once, and require rotation on first login
        #[arg(long)]
        generate: bool,

        /// Skip interactive prompts (requires --password-stdin or --generate)
        #[arg(long)]
        non_interactive: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Application database user to create
    #[arg(long, env = "MONGO_APP_USERNAME")]
    pub app_username: String,

    /// Password for the application database user
    #[arg(long, env = "MONGO_APP_PASSWORD", hide_env_values = true)]
    pub app_password: String,

    /// E-mail address recorded on the seeded admin account
    #[arg(long, env = "BIOSEED_ADMIN_EMAIL", default_value = DEFAULT_ADMIN_EMAIL)]
    pub admin_email: String,
}
