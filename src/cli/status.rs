use crate::bootstrap::inspect;
use crate::store;

use super::commands::ConnectionArgs;

fn mark(present: bool) -> &'static str {
    if present { "ok" } else { "missing" }
}

pub async fn run_status(connection: ConnectionArgs, json: bool) -> anyhow::Result<()> {
    let config = connection.into_config();
    config.validate()?;

    let store = store::open(&config).await?;
    let status = inspect(&store).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Status of {}", status.target);
    println!();
    println!("Collections:");
    for collection in &status.collections {
        println!("  {:<22} {}", collection.name, mark(collection.exists));
        for index in &collection.indexes {
            let unique = if index.unique { " (unique)" } else { "" };
            println!("    {:<20} {}{unique}", index.name, mark(index.present));
        }
    }

    println!();
    println!("Seed documents:");
    for seed in &status.seeds {
        println!(
            "  {:<20} {:<32} {}",
            seed.collection,
            seed.key,
            mark(seed.present)
        );
    }

    if status.admin_credential_pending == Some(true) {
        println!();
        println!("Admin credential not issued yet; run 'bioseed admin set-password'.");
    }

    println!();
    if status.is_complete() {
        println!("Database is fully provisioned.");
    } else {
        println!("Database is not fully provisioned; run 'bioseed init'.");
    }

    Ok(())
}
