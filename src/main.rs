use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bioseed::cli::{
    AdminCommands, ConnectionArgs, InitArgs, run_init, run_set_password, run_status,
};

#[derive(Parser)]
#[command(name = "bioseed")]
#[command(about = "Bootstrap the fraud-detection database: app user, collections, indexes, seed data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the database (safe to re-run)
    Init(InitArgs),

    /// Show which collections, indexes and seed documents are present
    Status {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bioseed=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => run_init(args).await?,
        Commands::Status { connection, json } => run_status(connection, json).await?,
        Commands::Admin { command } => match command {
            AdminCommands::SetPassword {
                connection,
                username,
                password_stdin,
                generate,
                non_interactive,
            } => {
                run_set_password(connection, username, password_stdin, generate, non_interactive)
                    .await?;
            }
        },
    }

    Ok(())
}
