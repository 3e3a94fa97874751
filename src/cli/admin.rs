use std::io::BufRead;

use inquire::Password;

use crate::auth::{MIN_PASSWORD_LENGTH, check_password};
use crate::bootstrap::{PasswordSource, set_password};
use crate::error::Error;
use crate::store;

use super::commands::ConnectionArgs;

fn read_password_stdin() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("no password received on stdin");
    }
    Ok(password)
}

fn prompt_password(username: &str) -> anyhow::Result<String> {
    let password = Password::new(&format!("New password for '{username}':"))
        .with_help_message(&format!("At least {MIN_PASSWORD_LENGTH} characters"))
        .with_validator(|input: &str| {
            Ok(check_password(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
        })
        .prompt()?;
    Ok(password)
}

pub async fn run_set_password(
    connection: ConnectionArgs,
    username: String,
    password_stdin: bool,
    generate: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let source = if generate {
        PasswordSource::Generated
    } else if password_stdin {
        PasswordSource::Provided(read_password_stdin()?)
    } else if non_interactive {
        anyhow::bail!("--password-stdin or --generate is required in non-interactive mode");
    } else {
        PasswordSource::Provided(prompt_password(&username)?)
    };

    let config = connection.into_config();
    config.validate()?;
    let store = store::open(&config).await?;

    let issued = match set_password(&store, &username, source).await {
        Err(Error::NotFound) => anyhow::bail!("User '{}' not found", username),
        other => other?,
    };

    println!();
    match issued.generated_password {
        Some(password) => {
            println!("========================================");
            println!(
                "Generated password for '{}' (save this, it won't be shown again):",
                issued.username
            );
            println!();
            println!("  {password}");
            println!();
            println!("It must be changed at first login.");
            println!("========================================");
        }
        None => println!("Password updated for '{}'", issued.username),
    }
    println!();

    Ok(())
}
