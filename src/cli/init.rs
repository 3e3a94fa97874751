use crate::bootstrap::{Bootstrapper, seed};
use crate::config::BootstrapConfig;
use crate::store;

use super::commands::InitArgs;

pub async fn run_init(args: InitArgs) -> anyhow::Result<()> {
    let config = BootstrapConfig {
        connection: args.connection.into_config(),
        app_username: args.app_username,
        app_password: args.app_password,
        admin_email: args.admin_email,
    };
    config.validate()?;

    let store = store::open(&config.connection).await?;
    let report = Bootstrapper::new(&store, &config).run().await?;

    print!("{report}");

    if report.admin_created() {
        println!();
        println!("==================================================================");
        println!("IMPORTANT: an administrator account was created");
        println!("Username: {}", seed::ADMIN_USERNAME);
        println!("It has no usable password yet. To set the initial password, run:");
        println!();
        println!("  bioseed admin set-password --username {}", seed::ADMIN_USERNAME);
        println!();
        println!("==================================================================");
        println!();
    }

    Ok(())
}
