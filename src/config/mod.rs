mod bootstrap;

pub use bootstrap::{
    Backend, BootstrapConfig, ConnectionConfig, DEFAULT_ADMIN_EMAIL, DEFAULT_MONGO_URI,
};
