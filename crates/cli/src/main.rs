use clap::{Parser, Subcommand};
use firin_core::auth::repository::SqliteUserRepository;
use sqlx::SqlitePool;

mod commands;
use commands::{handle_admin_command, handle_secret_command, AdminCommands, SecretCommands};

#[derive(Parser)]
#[command(name = "firin-cli")]
#[command(about = "Fırın CLI - management tool for the storefront back office")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL; falls back to DATABASE_URL, then db/firin.db
    #[arg(long)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Admin account management
    #[command(subcommand)]
    Admin(AdminCommands),

    /// Token signing secret utilities
    #[command(subcommand)]
    Secret(SecretCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Admin(admin_command) => {
            let database_url = cli
                .database
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .unwrap_or_else(|| "sqlite://db/firin.db".to_string());

            let pool = SqlitePool::connect(&database_url).await?;
            let repo = SqliteUserRepository::new(pool);
            handle_admin_command(admin_command, &repo).await?;
        }

        Commands::Secret(secret_command) => {
            handle_secret_command(&secret_command);
        }
    }

    Ok(())
}
