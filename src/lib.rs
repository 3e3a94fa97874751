//! # Bioseed
//!
//! One-shot, idempotent bootstrap for the fraud-detection platform's
//! database: the application user, the collection set, secondary indexes,
//! and reference seed documents. Usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! bioseed = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use bioseed::bootstrap::Bootstrapper;
//! use bioseed::config::{Backend, BootstrapConfig, ConnectionConfig};
//! use bioseed::store;
//!
//! let config = BootstrapConfig {
//!     connection: ConnectionConfig {
//!         backend: Backend::Mongo { uri: "mongodb://localhost:27017".into() },
//!         database: "fraud".into(),
//!     },
//!     app_username: "app".into(),
//!     app_password: "secret".into(),
//!     admin_email: "admin@example.com".into(),
//! };
//!
//! let store = store::open(&config.connection).await?;
//! let report = Bootstrapper::new(&store, &config).run().await?;
//! println!("{report}");
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
pub mod bootstrap;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod types;
