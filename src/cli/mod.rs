mod admin;
mod commands;
mod init;
mod status;

pub use admin::run_set_password;
pub use commands::{AdminCommands, ConnectionArgs, InitArgs};
pub use init::run_init;
pub use status::run_status;
